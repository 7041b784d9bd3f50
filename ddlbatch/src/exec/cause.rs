// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Cause-chain inspection for collaborator errors

use std::collections::HashSet;
use std::error::Error as StdError;

use super::error::{ErrorCode, ServiceError};

/// Find the first [`ServiceError`] in an error and its chain of sources
///
/// The walk starts at `error` itself and follows `source()`. Every visited
/// error is remembered by its wide pointer so a chain that loops back on itself
/// ends the walk instead of spinning. A source stored at offset 0 of its
/// wrapper shares the wrapper's address but not its vtable.
pub fn extract_service_cause<'a>(
    error: &'a (dyn StdError + 'static),
) -> Option<&'a ServiceError> {
    let mut visited: HashSet<*const (dyn StdError + 'static)> = HashSet::new();
    let mut cause = Some(error);

    while let Some(current) = cause {
        if !visited.insert(current as *const (dyn StdError + 'static)) {
            break;
        }
        if let Some(service_error) = current.downcast_ref::<ServiceError>() {
            return Some(service_error);
        }
        cause = current.source();
    }

    None
}

/// Status code of the first service error in the chain, `Unknown` if none
pub fn extract_error_code(error: &(dyn StdError + 'static)) -> ErrorCode {
    extract_service_cause(error)
        .map(|service_error| service_error.code)
        .unwrap_or(ErrorCode::Unknown)
}

/// Messages of an error and its sources, joined with `": "`
pub fn error_chain_message(error: &(dyn StdError + 'static)) -> String {
    let mut visited: HashSet<*const (dyn StdError + 'static)> = HashSet::new();
    let mut parts = Vec::new();
    let mut cause = Some(error);

    while let Some(current) = cause {
        if !visited.insert(current as *const (dyn StdError + 'static)) {
            break;
        }
        parts.push(current.to_string());
        cause = current.source();
    }

    parts.join(": ")
}
