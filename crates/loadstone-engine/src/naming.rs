//! Artifact naming.

use chrono::{DateTime, Utc};

const RUN_STAMP_FORMAT: &str = "%Y%m%dT%H%M%SZ";

pub(crate) fn run_stamp(at: DateTime<Utc>) -> String {
    at.format(RUN_STAMP_FORMAT).to_string()
}

pub(crate) fn reject_artifact_name(dataset: &str, stamp: &str) -> String {
    format!("{dataset}_rejected_{stamp}.csv")
}

pub(crate) fn valid_artifact_name(dataset: &str, stamp: &str) -> String {
    format!("{dataset}_valid_{stamp}.csv")
}

pub(crate) fn backup_artifact_name(table: &str, stamp: &str) -> String {
    format!("{table}_{stamp}.arrow")
}
