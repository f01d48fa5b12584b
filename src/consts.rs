/// Offset of the YYYYMMDD date inside a PPMS invoice reference,
/// e.g. "PPMS2-NICatKings-20191101-DRAFT"
pub(crate) const REF_DATE_OFFSET: usize = 17;

/// Suffix PPMS appends to references of invoices not yet finalised
pub(crate) const DRAFT_SUFFIX: &str = "DRAFT";

/// Finance account code booked against each user's activity code
pub(crate) const TRANSACTION_ACCOUNT: u32 = 4213;

/// Finance account code booked against the facility's own activity code
pub(crate) const NIC_ACCOUNT: u32 = 4113;

/// Worksheet name expected by the finance voucher template
pub(crate) const VOUCHER_SHEET: &str = "Voucher Data";

pub(crate) const VOUCHER_HEADER: [&str; 4] = ["Description", "Amount", "account code", "activity code"];
