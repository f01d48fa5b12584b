//! Per-session-type summaries for one account
//!
//! Rows are partitioned by their literal `Session Type` value, not by
//! family, and each partition is reduced to counts and sums.

use serde::Serialize;
use std::collections::BTreeMap;

use crate::core::session::{SessionFamily, SessionRow, numeric_cell};
use crate::error::Result;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub(crate) struct UsageSummary {
    pub(crate) account_number: String,
    pub(crate) group: String,
    pub(crate) sessions: usize,
    pub(crate) hours_booked: f64,
    pub(crate) hours_used: f64,
    pub(crate) rebate: f64,
    pub(crate) fees: f64,
    pub(crate) final_amount: f64,
    pub(crate) initial_amount: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub(crate) struct TrainingSummary {
    pub(crate) account_number: String,
    pub(crate) group: String,
    pub(crate) sessions: usize,
    pub(crate) hours_booked: f64,
    pub(crate) final_amount: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub(crate) enum SessionSummary {
    Usage(UsageSummary),
    Training(TrainingSummary),
}

impl SessionSummary {
    pub(crate) fn sessions(&self) -> usize {
        match self {
            SessionSummary::Usage(s) => s.sessions,
            SessionSummary::Training(s) => s.sessions,
        }
    }

    pub(crate) fn final_amount(&self) -> f64 {
        match self {
            SessionSummary::Usage(s) => s.final_amount,
            SessionSummary::Training(s) => s.final_amount,
        }
    }
}

/// Running sums for one partition. Minutes are kept until the end so the
/// hour conversion happens once.
#[derive(Debug, Default)]
struct SummaryAccumulator {
    account_number: String,
    group: String,
    sessions: usize,
    booked_minutes: f64,
    used_minutes: f64,
    duration_minutes: f64,
    rebate: f64,
    fees: f64,
    final_amount: f64,
}

impl SummaryAccumulator {
    /// The first row of a partition supplies its account and group
    fn new(first: &SessionRow) -> Self {
        SummaryAccumulator {
            account_number: first.account().to_string(),
            group: first.group_ref().to_string(),
            ..Self::default()
        }
    }

    fn add_row(&mut self, row: &SessionRow) -> Result<()> {
        self.sessions += 1;
        self.booked_minutes += numeric_cell("Duration (booked)", row.booked_minutes.as_deref())?;
        self.used_minutes += numeric_cell("Duration (used)", row.used_minutes.as_deref())?;
        self.duration_minutes += numeric_cell("Duration", row.duration_minutes.as_deref())?;
        self.rebate += numeric_cell("Rebate", row.rebate.as_deref())?;
        self.fees += numeric_cell("Fee", row.fee.as_deref())?;
        self.final_amount += numeric_cell("Final Amount", row.final_amount.as_deref())?;
        Ok(())
    }

    fn into_summary(self, session_type: &str) -> SessionSummary {
        let is_training = SessionFamily::Training.matches(session_type)
            && !SessionFamily::Autonomous.matches(session_type)
            && !SessionFamily::Assisted.matches(session_type);

        if is_training {
            return SessionSummary::Training(TrainingSummary {
                account_number: self.account_number,
                group: self.group,
                sessions: self.sessions,
                hours_booked: self.duration_minutes / 60.0,
                final_amount: self.final_amount,
            });
        }

        SessionSummary::Usage(UsageSummary {
            account_number: self.account_number,
            group: self.group,
            sessions: self.sessions,
            hours_booked: self.booked_minutes / 60.0,
            hours_used: self.used_minutes / 60.0,
            rebate: self.rebate,
            fees: self.fees,
            final_amount: self.final_amount,
            initial_amount: self.final_amount + self.fees - self.rebate,
        })
    }
}

/// Summarise one account's rows keyed by exact session type.
///
/// Any non-numeric duration or money cell fails the whole aggregation.
pub(crate) fn summarize_by_type(rows: &[SessionRow]) -> Result<BTreeMap<String, SessionSummary>> {
    let mut partitions: BTreeMap<String, SummaryAccumulator> = BTreeMap::new();

    for row in rows {
        let acc = partitions
            .entry(row.session_type().to_string())
            .or_insert_with(|| SummaryAccumulator::new(row));
        acc.add_row(row)?;
    }

    Ok(partitions
        .into_iter()
        .map(|(session_type, acc)| {
            let summary = acc.into_summary(&session_type);
            (session_type, summary)
        })
        .collect())
}
