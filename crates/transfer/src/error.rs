// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Transfer-layer errors.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransferError {
    #[error("transfer cancelled")]
    Cancelled,

    #[error("source path does not exist: {0}")]
    MissingSource(PathBuf),

    #[error("unknown provider: {0}")]
    UnknownProvider(String),

    #[error("remote configuration error: {0}")]
    Config(String),

    #[error("{path}: {source}")]
    File {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl TransferError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, TransferError::Cancelled)
    }

    pub(crate) fn file(path: impl Into<String>, source: std::io::Error) -> Self {
        TransferError::File { path: path.into(), source }
    }
}
