// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Update counts of a schema-change operation

use crate::admin::DdlMetadata;

/// One update count per statement in `metadata`
///
/// Statement `i` counts as `1` when the service recorded a commit marker for
/// it and `0` otherwise. A missing marker means the statement was not
/// confirmed, which is not the same as having failed.
pub fn extract_update_counts(metadata: &DdlMetadata) -> Vec<i64> {
    (0..metadata.statement_count())
        .map(|index| i64::from(metadata.commit_timestamp(index).is_some()))
        .collect()
}
