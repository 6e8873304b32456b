use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};

use crate::{
    error::ModelError,
    ids::{ConfirmationId, CourseId, PaymentId, StaffId, StudentId},
};

pub const DEFAULT_PAGE_LIMIT: u32 = 20;
pub const MAX_PAGE_LIMIT: u32 = 100;

/// Staff decision state of an admission confirmation. Leaves `Pending` once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum AdmissionStatus {
    Pending,
    Confirmed,
    Rejected,
}

impl AdmissionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AdmissionStatus::Pending => "pending",
            AdmissionStatus::Confirmed => "confirmed",
            AdmissionStatus::Rejected => "rejected",
        }
    }
}

impl fmt::Display for AdmissionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AdmissionStatus {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(AdmissionStatus::Pending),
            "confirmed" => Ok(AdmissionStatus::Confirmed),
            "rejected" => Ok(AdmissionStatus::Rejected),
            other => Err(ModelError::UnknownStatus {
                kind: "admission",
                value: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct AdmissionConfirmation {
    pub id: ConfirmationId,
    pub student_id: StudentId,
    pub course_id: Option<CourseId>,
    pub payment_id: PaymentId,
    pub status: AdmissionStatus,
    pub rejection_reason: Option<String>,
    pub notes: Option<String>,
    pub decided_by: Option<StaffId>,
    pub decided_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    /// Gateway references of the owning payment, denormalized for search.
    pub gateway_order_id: String,
    pub gateway_payment_id: Option<String>,
}

/// A staff decision on a pending confirmation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdmissionDecision {
    Confirm { notes: Option<String> },
    Reject { reason: String, notes: Option<String> },
}

impl AdmissionDecision {
    pub fn target_status(&self) -> AdmissionStatus {
        match self {
            AdmissionDecision::Confirm { .. } => AdmissionStatus::Confirmed,
            AdmissionDecision::Reject { .. } => AdmissionStatus::Rejected,
        }
    }

    pub fn notes(&self) -> Option<&str> {
        match self {
            AdmissionDecision::Confirm { notes }
            | AdmissionDecision::Reject { notes, .. } => notes.as_deref(),
        }
    }

    pub fn rejection_reason(&self) -> Option<&str> {
        match self {
            AdmissionDecision::Confirm { .. } => None,
            AdmissionDecision::Reject { reason, .. } => Some(reason),
        }
    }
}

/// Listing filter for the staff dashboard. Pages are 1-based.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct AdmissionFilter {
    pub status: Option<AdmissionStatus>,
    pub search: Option<String>,
    pub page: u32,
    pub limit: u32,
}

impl Default for AdmissionFilter {
    fn default() -> Self {
        Self {
            status: None,
            search: None,
            page: 1,
            limit: DEFAULT_PAGE_LIMIT,
        }
    }
}

impl AdmissionFilter {
    /// Clamp paging to sane bounds and drop blank search terms.
    pub fn normalized(mut self) -> Self {
        self.page = self.page.max(1);
        self.limit = if self.limit == 0 {
            DEFAULT_PAGE_LIMIT
        } else {
            self.limit.min(MAX_PAGE_LIMIT)
        };
        self.search = self
            .search
            .map(|term| term.trim().to_string())
            .filter(|term| !term.is_empty());
        self
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.limit)
    }

    /// Case-insensitive substring match over the gateway references.
    pub fn matches(&self, confirmation: &AdmissionConfirmation) -> bool {
        if let Some(status) = self.status
            && confirmation.status != status
        {
            return false;
        }

        match self.search.as_deref() {
            None => true,
            Some(term) => {
                let needle = term.to_lowercase();
                confirmation
                    .gateway_order_id
                    .to_lowercase()
                    .contains(&needle)
                    || confirmation
                        .gateway_payment_id
                        .as_deref()
                        .is_some_and(|id| id.to_lowercase().contains(&needle))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AdmissionPage {
    pub items: Vec<AdmissionConfirmation>,
    pub total: u64,
    pub page: u32,
    pub limit: u32,
}

/// Counts by status, recomputed from current rows on every request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AdmissionStats {
    pub pending: u64,
    pub confirmed: u64,
    pub rejected: u64,
    pub total: u64,
}

impl AdmissionStats {
    pub fn record(&mut self, status: AdmissionStatus) {
        match status {
            AdmissionStatus::Pending => self.pending += 1,
            AdmissionStatus::Confirmed => self.confirmed += 1,
            AdmissionStatus::Rejected => self.rejected += 1,
        }
        self.total += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn confirmation(order: &str, payment: Option<&str>) -> AdmissionConfirmation {
        AdmissionConfirmation {
            id: ConfirmationId::new(),
            student_id: StudentId::new(),
            course_id: None,
            payment_id: PaymentId::new(),
            status: AdmissionStatus::Pending,
            rejection_reason: None,
            notes: None,
            decided_by: None,
            decided_at: None,
            created_at: Utc::now(),
            gateway_order_id: order.to_string(),
            gateway_payment_id: payment.map(str::to_string),
        }
    }

    #[test]
    fn normalizes_paging_and_search() {
        let filter = AdmissionFilter {
            status: None,
            search: Some("   ".into()),
            page: 0,
            limit: 500,
        }
        .normalized();
        assert_eq!(filter.page, 1);
        assert_eq!(filter.limit, MAX_PAGE_LIMIT);
        assert_eq!(filter.search, None);
        assert_eq!(filter.offset(), 0);
    }

    #[test]
    fn search_covers_both_gateway_references() {
        let filter = AdmissionFilter {
            search: Some("PAY_77".into()),
            ..AdmissionFilter::default()
        }
        .normalized();

        assert!(filter.matches(&confirmation("order_1", Some("pay_77abc"))));
        assert!(!filter.matches(&confirmation("order_1", None)));
        assert!(filter.matches(&confirmation("order_pay_77", None)));
    }
}
