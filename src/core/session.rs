//! Session records parsed from PPMS invoice detail rows
//!
//! A detail row is classified into a session family by substring match on
//! its `Session Type` label. Autonomous and assisted sessions share one
//! record shape (booking/usage durations plus adjustments); training
//! sessions carry a single duration.

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// One row of a `getinvoicedetails` response, keyed by PPMS column name.
///
/// Every cell is optional: the autonomous and training sections of a
/// response carry different columns, and rows from both end up in the
/// same list.
#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct SessionRow {
    #[serde(rename = "Session Type", default)]
    pub(crate) session_type: Option<String>,
    #[serde(rename = "Reference", default)]
    pub(crate) reference: Option<String>,
    #[serde(rename = "User", default)]
    pub(crate) user: Option<String>,
    #[serde(rename = "System Type", default)]
    pub(crate) system_type: Option<String>,
    #[serde(rename = "System", default)]
    pub(crate) system: Option<String>,
    #[serde(rename = "Date", default)]
    pub(crate) date: Option<String>,
    #[serde(rename = "Start time", default)]
    pub(crate) start_time: Option<String>,
    #[serde(rename = "Account number", default)]
    pub(crate) account_number: Option<String>,
    #[serde(rename = "Group", default)]
    pub(crate) group: Option<String>,
    #[serde(rename = "Duration (booked)", default)]
    pub(crate) booked_minutes: Option<String>,
    #[serde(rename = "Duration (used)", default)]
    pub(crate) used_minutes: Option<String>,
    #[serde(rename = "Duration", default)]
    pub(crate) duration_minutes: Option<String>,
    #[serde(rename = "Notes", default)]
    pub(crate) notes: Option<String>,
    #[serde(rename = "Fee", default)]
    pub(crate) fee: Option<String>,
    #[serde(rename = "Subsidy", default)]
    pub(crate) subsidy: Option<String>,
    #[serde(rename = "Rebate", default)]
    pub(crate) rebate: Option<String>,
    #[serde(rename = "Final Amount", default)]
    pub(crate) final_amount: Option<String>,
}

/// Coerce a cell to a number. Missing and blank cells count as zero;
/// anything else must parse.
pub(crate) fn numeric_cell(column: &str, cell: Option<&str>) -> Result<f64> {
    let Some(raw) = cell else {
        return Ok(0.0);
    };
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(0.0);
    }
    trimmed.parse::<f64>().map_err(|_| AppError::Parse {
        column: column.to_string(),
        value: raw.to_string(),
    })
}

fn text_cell(cell: &Option<String>) -> String {
    cell.clone().unwrap_or_default()
}

impl SessionRow {
    pub(crate) fn session_type(&self) -> &str {
        self.session_type.as_deref().unwrap_or("")
    }

    pub(crate) fn account(&self) -> &str {
        self.account_number.as_deref().unwrap_or("")
    }

    pub(crate) fn group_ref(&self) -> &str {
        self.group.as_deref().unwrap_or("")
    }
}

/// The three session families an invoice is broken down by
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SessionFamily {
    Autonomous,
    Assisted,
    Training,
}

impl SessionFamily {
    pub(crate) const ALL: [SessionFamily; 3] = [
        SessionFamily::Autonomous,
        SessionFamily::Assisted,
        SessionFamily::Training,
    ];

    /// Substring PPMS uses in `Session Type` labels for this family
    pub(crate) fn label(self) -> &'static str {
        match self {
            SessionFamily::Autonomous => "autonomous",
            SessionFamily::Assisted => "assisted",
            SessionFamily::Training => "training",
        }
    }

    pub(crate) fn display_name(self) -> &'static str {
        match self {
            SessionFamily::Autonomous => "Autonomous",
            SessionFamily::Assisted => "Assisted",
            SessionFamily::Training => "Training",
        }
    }

    pub(crate) fn matches(self, session_type: &str) -> bool {
        session_type.contains(self.label())
    }
}

/// Number of sessions seen per family while parsing one account's rows.
///
/// A label containing both "autonomous" and "assisted" counts toward both.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub(crate) struct FamilyCounts {
    pub(crate) autonomous: usize,
    pub(crate) assisted: usize,
    pub(crate) training: usize,
}

/// Fields common to every session kind
#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct SessionInfo {
    pub(crate) session_type: String,
    pub(crate) session_ref: String,
    pub(crate) user: String,
    pub(crate) system_type: String,
    pub(crate) system: String,
    pub(crate) date: String,
    pub(crate) start_time: String,
    pub(crate) final_amount: f64,
}

/// Autonomous or assisted instrument session
#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct UsageSession {
    #[serde(flatten)]
    pub(crate) info: SessionInfo,
    pub(crate) booked_time: f64,
    pub(crate) used_time: f64,
    pub(crate) notes: String,
    pub(crate) fee: f64,
    pub(crate) subsidy: f64,
    /// Charge before adjustments: `final_amount - fee + subsidy`
    pub(crate) initial_amount: f64,
}

impl UsageSession {
    pub(crate) fn new(
        info: SessionInfo,
        booked_time: f64,
        used_time: f64,
        notes: String,
        fee: f64,
        subsidy: f64,
    ) -> Self {
        let initial_amount = info.final_amount - fee + subsidy;
        UsageSession {
            info,
            booked_time,
            used_time,
            notes,
            fee,
            subsidy,
            initial_amount,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct TrainingSession {
    #[serde(flatten)]
    pub(crate) info: SessionInfo,
    pub(crate) duration: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub(crate) enum Session {
    Usage(UsageSession),
    Training(TrainingSession),
}

impl Session {
    pub(crate) fn info(&self) -> &SessionInfo {
        match self {
            Session::Usage(s) => &s.info,
            Session::Training(s) => &s.info,
        }
    }

    pub(crate) fn session_type(&self) -> &str {
        &self.info().session_type
    }

    pub(crate) fn final_amount(&self) -> f64 {
        self.info().final_amount
    }

    /// Training sessions never carry fees
    pub(crate) fn fee(&self) -> f64 {
        match self {
            Session::Usage(s) => s.fee,
            Session::Training(_) => 0.0,
        }
    }

    pub(crate) fn subsidy(&self) -> f64 {
        match self {
            Session::Usage(s) => s.subsidy,
            Session::Training(_) => 0.0,
        }
    }
}

/// Build a session from one detail row, bumping the family counters as a
/// side effect. Rows whose label matches no family yield `None`.
pub(crate) fn parse_session(row: &SessionRow, counts: &mut FamilyCounts) -> Result<Option<Session>> {
    let label = row.session_type();
    let autonomous = SessionFamily::Autonomous.matches(label);
    let assisted = SessionFamily::Assisted.matches(label);

    if !autonomous && !assisted && !SessionFamily::Training.matches(label) {
        return Ok(None);
    }

    let info = SessionInfo {
        session_type: label.to_string(),
        session_ref: text_cell(&row.reference),
        user: text_cell(&row.user),
        system_type: text_cell(&row.system_type),
        system: text_cell(&row.system),
        date: text_cell(&row.date),
        start_time: text_cell(&row.start_time),
        final_amount: numeric_cell("Final Amount", row.final_amount.as_deref())?,
    };

    if autonomous || assisted {
        let session = UsageSession::new(
            info,
            numeric_cell("Duration (booked)", row.booked_minutes.as_deref())?,
            numeric_cell("Duration (used)", row.used_minutes.as_deref())?,
            text_cell(&row.notes),
            numeric_cell("Fee", row.fee.as_deref())?,
            numeric_cell("Subsidy", row.subsidy.as_deref())?,
        );
        if autonomous {
            counts.autonomous += 1;
        }
        if assisted {
            counts.assisted += 1;
        }
        return Ok(Some(Session::Usage(session)));
    }

    let session = TrainingSession {
        info,
        duration: numeric_cell("Duration", row.duration_minutes.as_deref())?,
    };
    counts.training += 1;
    Ok(Some(Session::Training(session)))
}
