//! Request and response bodies of the `runReport` method

use serde::{Deserialize, Serialize};

use crate::models::{MatchType, ReportRow, ReportSpec};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RunReportRequest<'a> {
    date_ranges: [WireDateRange<'a>; 1],
    metrics: Vec<Named<'a>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    dimensions: Vec<Named<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    dimension_filter: Option<FilterExpression<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WireDateRange<'a> {
    start_date: &'a str,
    end_date: &'a str,
}

#[derive(Debug, Serialize)]
struct Named<'a> {
    name: &'a str,
}

#[derive(Debug, Serialize)]
struct FilterExpression<'a> {
    filter: Filter<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Filter<'a> {
    field_name: &'a str,
    string_filter: StringFilter<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StringFilter<'a> {
    match_type: MatchType,
    value: &'a str,
}

impl<'a> From<&'a ReportSpec> for RunReportRequest<'a> {
    fn from(spec: &'a ReportSpec) -> Self {
        Self {
            date_ranges: [WireDateRange {
                start_date: &spec.date_range.start,
                end_date: &spec.date_range.end,
            }],
            metrics: spec.metrics.iter().map(|name| Named { name }).collect(),
            dimensions: spec
                .dimension
                .iter()
                .map(|name| Named { name })
                .collect(),
            dimension_filter: spec.filter.as_ref().map(|f| FilterExpression {
                filter: Filter {
                    field_name: &f.field,
                    string_filter: StringFilter {
                        match_type: f.match_type,
                        value: &f.value,
                    },
                },
            }),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RunReportResponse {
    #[serde(default)]
    pub rows: Vec<WireRow>,
    #[serde(default)]
    pub error: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WireRow {
    #[serde(default)]
    dimension_values: Vec<WireValue>,
    #[serde(default)]
    metric_values: Vec<WireValue>,
}

#[derive(Debug, Deserialize)]
struct WireValue {
    #[serde(default)]
    value: Option<String>,
}

impl From<WireRow> for ReportRow {
    fn from(row: WireRow) -> Self {
        let values = |v: Vec<WireValue>| -> Vec<String> {
            v.into_iter().map(|w| w.value.unwrap_or_default()).collect()
        };
        Self {
            dimension_values: values(row.dimension_values),
            metric_values: values(row.metric_values),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DateRange, DimensionFilter};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn plain_metric_request_omits_dimensions() {
        let spec = ReportSpec::metric("activeUsers", "activeUsers", DateRange::new("30daysAgo", "today"));

        assert_eq!(
            serde_json::to_value(RunReportRequest::from(&spec)).unwrap(),
            json!({
                "dateRanges": [{ "startDate": "30daysAgo", "endDate": "today" }],
                "metrics": [{ "name": "activeUsers" }]
            })
        );
    }

    #[test]
    fn filtered_request_matches_reporting_api_shape() {
        let spec = ReportSpec::event_count(
            "downloads",
            DateRange::new("2025-09-01", "today"),
            DimensionFilter {
                field: "eventName".to_string(),
                match_type: MatchType::Exact,
                value: "apk_download".to_string(),
            },
        );

        assert_eq!(
            serde_json::to_value(RunReportRequest::from(&spec)).unwrap(),
            json!({
                "dateRanges": [{ "startDate": "2025-09-01", "endDate": "today" }],
                "metrics": [{ "name": "eventCount" }],
                "dimensions": [{ "name": "eventName" }],
                "dimensionFilter": {
                    "filter": {
                        "fieldName": "eventName",
                        "stringFilter": { "matchType": "EXACT", "value": "apk_download" }
                    }
                }
            })
        );
    }

    #[test]
    fn response_rows_convert_and_tolerate_missing_fields() {
        let response: RunReportResponse = serde_json::from_value(json!({
            "dimensionHeaders": [{ "name": "eventName" }],
            "metricHeaders": [{ "name": "eventCount", "type": "TYPE_INTEGER" }],
            "rows": [
                { "dimensionValues": [{ "value": "apk_download" }], "metricValues": [{ "value": "31" }] },
                { "metricValues": [{}] }
            ],
            "rowCount": 2
        }))
        .unwrap();

        let rows: Vec<ReportRow> = response.rows.into_iter().map(ReportRow::from).collect();
        assert_eq!(rows[0].dimension_values, vec!["apk_download"]);
        assert_eq!(rows[0].metric_values, vec!["31"]);
        assert_eq!(rows[1].metric_values, vec![""]);
        assert!(response.error.is_none());
    }

    #[test]
    fn empty_response_has_no_rows() {
        let response: RunReportResponse =
            serde_json::from_value(json!({ "metricHeaders": [], "kind": "analyticsData#runReport" })).unwrap();
        assert!(response.rows.is_empty());
    }
}
