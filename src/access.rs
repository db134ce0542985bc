//! Permission seam.
//!
//! The engine never decides who may see or change a report; it asks a
//! [`PermissionCheck`] supplied by the host application.

use std::fmt;

use crate::model::ReportId;

/// What a permission question is about.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PermissionTarget {
    /// A saved report.
    Report(ReportId),
    /// A module key, i.e. the base entity of an unsaved report.
    Module(String),
}

impl fmt::Display for PermissionTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PermissionTarget::Report(id) => write!(f, "report {}", id),
            PermissionTarget::Module(key) => write!(f, "module '{}'", key),
        }
    }
}

pub trait PermissionCheck: Send + Sync {
    fn can_view(&self, target: &PermissionTarget) -> bool;
    fn can_edit(&self, target: &PermissionTarget) -> bool;
}

/// Grants everything. Used by the CLI and in tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

impl PermissionCheck for AllowAll {
    fn can_view(&self, _target: &PermissionTarget) -> bool {
        true
    }

    fn can_edit(&self, _target: &PermissionTarget) -> bool {
        true
    }
}
