//! Challenge catalogue, instances and the progress evaluation rule.
//!
//! A [`Challenge`] is immutable catalogue data. Activating one for a user
//! yields a [`ChallengeInstance`] whose period is derived from the
//! challenge's [`PeriodType`]. Progress is recomputed on demand by
//! [`evaluate`], a pure function over the CO2 totals of two windows:
//!
//! - the reference window, the 30 days before the instance starts;
//! - the current window, from the start to `min(now, end)`.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, Duration, NaiveTime, TimeZone, Utc};

use super::UserId;

/// Code of the only challenge with an implemented evaluation rule.
pub const CO2_REDUCTION_CODE: &str = "CO2_30D_MINUS_10";
/// Length of the reference window preceding an instance.
pub const REFERENCE_WINDOW_DAYS: i64 = 30;
/// Minimum distinct days of reference history before progress is computed.
pub const MIN_REFERENCE_DAYS: u32 = 7;
/// Minimum distinct days of current-window data before progress is computed.
pub const MIN_CURRENT_DAYS: u32 = 1;
/// Target used when neither the instance nor the challenge carries one.
pub const DEFAULT_TARGET_FRACTION: f64 = 0.10;
/// Slack allowed when comparing a reduction against its target, so an exact
/// hit such as 100 kg to 90 kg at 10 % counts despite f64 rounding.
pub const TARGET_TOLERANCE: f64 = 1e-9;

/// Shown while the reference window lacks enough history to compare.
pub const INSUFFICIENT_HISTORY_MESSAGE: &str =
    "Pas encore assez d'historique CO2 pour évaluer ce défi. Continue à scanner.";
/// Shown when the current window has no cart yet.
pub const NO_CURRENT_DATA_MESSAGE: &str =
    "Ajoutez au moins un panier sur la période en cours pour mesurer votre progression CO2.";
/// Shown once the target reduction is reached.
pub const SUCCESS_MESSAGE: &str = "Bravo ! Objectif de réduction CO2 atteint.";

/// Lifecycle state of a challenge instance.
///
/// Stored as `ACTIVE`/`SUCCESS`/`FAILED`; presented to clients through
/// [`ChallengeStatus::display_label`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChallengeStatus {
    Active,
    Success,
    Failed,
}

impl ChallengeStatus {
    #[must_use]
    pub fn as_db_str(self) -> &'static str {
        match self {
            Self::Active => "ACTIVE",
            Self::Success => "SUCCESS",
            Self::Failed => "FAILED",
        }
    }

    /// Label shown at the API boundary.
    #[must_use]
    pub fn display_label(self) -> &'static str {
        match self {
            Self::Active => "en_cours",
            Self::Success => "reussi",
            Self::Failed => "echoue",
        }
    }

    /// `Success` and `Failed` never transition again.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Active)
    }
}

impl fmt::Display for ChallengeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_db_str())
    }
}

/// Error returned when a stored status string is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown challenge status: {0}")]
pub struct ParseChallengeStatusError(pub String);

impl FromStr for ChallengeStatus {
    type Err = ParseChallengeStatusError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_uppercase().as_str() {
            "ACTIVE" | "EN_COURS" => Ok(Self::Active),
            "SUCCESS" | "REUSSI" => Ok(Self::Success),
            "FAILED" | "ECHOUE" | "EXPIRE" => Ok(Self::Failed),
            _ => Err(ParseChallengeStatusError(value.to_owned())),
        }
    }
}

/// How an activation period is derived from the activation instant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PeriodType {
    Rolling30Days,
    Rolling7Days,
    CalendarMonth,
    /// Unrecognised catalogue value; treated as thirty rolling days.
    Other(String),
}

impl PeriodType {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Rolling30Days => "30_jours_glissants",
            Self::Rolling7Days => "7_jours_glissants",
            Self::CalendarMonth => "mois_calendaire",
            Self::Other(raw) => raw.as_str(),
        }
    }

    /// Compute the activation period starting at `now`.
    ///
    /// # Examples
    /// ```
    /// use carbon_tracker::domain::challenge::PeriodType;
    /// use chrono::{TimeZone, Utc};
    ///
    /// let now = Utc.with_ymd_and_hms(2025, 2, 10, 9, 0, 0).unwrap();
    /// let period = PeriodType::CalendarMonth.activation_period(now);
    /// assert_eq!(period.start, Utc.with_ymd_and_hms(2025, 2, 1, 0, 0, 0).unwrap());
    /// assert_eq!(period.end, Utc.with_ymd_and_hms(2025, 2, 28, 23, 59, 59).unwrap());
    /// ```
    pub fn activation_period(&self, now: DateTime<Utc>) -> ChallengePeriod {
        match self {
            Self::Rolling7Days => ChallengePeriod {
                start: now,
                end: now + Duration::days(7),
            },
            Self::CalendarMonth => calendar_month(now),
            Self::Rolling30Days | Self::Other(_) => ChallengePeriod {
                start: now,
                end: now + Duration::days(30),
            },
        }
    }
}

impl From<&str> for PeriodType {
    fn from(value: &str) -> Self {
        match value {
            "30_jours_glissants" => Self::Rolling30Days,
            "7_jours_glissants" => Self::Rolling7Days,
            "mois_calendaire" => Self::CalendarMonth,
            other => Self::Other(other.to_owned()),
        }
    }
}

fn calendar_month(now: DateTime<Utc>) -> ChallengePeriod {
    let first = now
        .date_naive()
        .with_day(1)
        .unwrap_or_else(|| now.date_naive());
    let next_month_first = if first.month() == 12 {
        first.with_year(first.year() + 1).and_then(|d| d.with_month(1))
    } else {
        first.with_month(first.month() + 1)
    };
    let last = next_month_first
        .and_then(|d| d.pred_opt())
        .unwrap_or(first);
    let end_of_day = NaiveTime::from_hms_opt(23, 59, 59).unwrap_or(NaiveTime::MIN);
    ChallengePeriod {
        start: Utc.from_utc_datetime(&first.and_time(NaiveTime::MIN)),
        end: Utc.from_utc_datetime(&last.and_time(end_of_day)),
    }
}

/// Start and end instants of one activation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChallengePeriod {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// Catalogue entry.
#[derive(Debug, Clone, PartialEq)]
pub struct Challenge {
    pub id: i64,
    pub code: String,
    pub name: String,
    pub description: Option<String>,
    pub metric: String,
    pub logic_type: String,
    pub period_type: PeriodType,
    pub default_target_value: f64,
    pub scope_type: String,
    pub active: bool,
}

impl Challenge {
    /// Whether [`evaluate`] knows how to score this challenge.
    pub fn is_evaluable(&self) -> bool {
        self.code == CO2_REDUCTION_CODE
    }
}

/// One user's attempt at a challenge.
#[derive(Debug, Clone, PartialEq)]
pub struct ChallengeInstance {
    pub id: i64,
    pub user_id: UserId,
    pub challenge_id: i64,
    pub period: ChallengePeriod,
    pub status: ChallengeStatus,
    pub reference_value: Option<f64>,
    pub current_value: Option<f64>,
    pub target_value: Option<f64>,
    pub progress_percent: Option<f64>,
    pub message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub last_evaluated_at: Option<DateTime<Utc>>,
}

/// An instance paired with its catalogue entry.
#[derive(Debug, Clone, PartialEq)]
pub struct ActiveChallenge {
    pub challenge: Challenge,
    pub instance: ChallengeInstance,
}

/// Interval over which cart history is summed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
    /// Whether rows stamped exactly at `to` are included.
    pub inclusive_end: bool,
}

/// Sum of cart CO2 within a window.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Co2WindowTotals {
    pub total_grams: f64,
    pub distinct_days: u32,
}

impl Co2WindowTotals {
    pub fn total_kg(&self) -> f64 {
        self.total_grams / 1000.0
    }
}

/// The two windows compared during evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvaluationWindows {
    pub reference: TimeWindow,
    pub current: TimeWindow,
    /// True once `now` has reached the period end.
    pub closed: bool,
}

/// Derive the reference and current windows for an instance period.
pub fn evaluation_windows(period: ChallengePeriod, now: DateTime<Utc>) -> EvaluationWindows {
    let closed = now >= period.end;
    EvaluationWindows {
        reference: TimeWindow {
            from: period.start - Duration::days(REFERENCE_WINDOW_DAYS),
            to: period.start,
            inclusive_end: false,
        },
        current: TimeWindow {
            from: period.start,
            to: if closed { period.end } else { now },
            inclusive_end: true,
        },
        closed,
    }
}

/// Interpret a stored target as a fraction; values above 1 are percentages.
///
/// # Examples
/// ```
/// use carbon_tracker::domain::challenge::normalize_target;
///
/// assert_eq!(normalize_target(10.0), 0.10);
/// assert_eq!(normalize_target(0.25), 0.25);
/// ```
#[must_use]
pub fn normalize_target(raw: f64) -> f64 {
    if raw > 1.0 { raw / 100.0 } else { raw }
}

/// Inputs to [`evaluate`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EvaluationInputs {
    pub reference: Co2WindowTotals,
    pub current: Co2WindowTotals,
    pub target_fraction: f64,
    pub window_closed: bool,
}

/// Result of one evaluation pass.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub status: ChallengeStatus,
    /// Reference CO2 in kg; absent when the reference window is empty.
    pub reference_value: Option<f64>,
    /// Current CO2 in kg.
    pub current_value: Option<f64>,
    pub target_value: f64,
    pub progress_percent: Option<f64>,
    pub message: String,
}

impl Evaluation {
    /// Rebuild the stored outcome of a terminal instance.
    pub fn from_stored(instance: &ChallengeInstance, default_target: f64) -> Self {
        let target_value =
            normalize_target(instance.target_value.unwrap_or(default_target));
        let message = instance.message.clone().unwrap_or_else(|| {
            match instance.status {
                ChallengeStatus::Success => SUCCESS_MESSAGE.to_owned(),
                ChallengeStatus::Active | ChallengeStatus::Failed => {
                    "Défi terminé.".to_owned()
                }
            }
        });
        Self {
            status: instance.status,
            reference_value: instance.reference_value,
            current_value: instance.current_value,
            target_value,
            progress_percent: instance.progress_percent,
            message,
        }
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Score a reduction challenge.
///
/// # Examples
/// ```
/// use carbon_tracker::domain::challenge::{
///     ChallengeStatus, Co2WindowTotals, EvaluationInputs, evaluate,
/// };
///
/// let evaluation = evaluate(EvaluationInputs {
///     reference: Co2WindowTotals { total_grams: 100_000.0, distinct_days: 10 },
///     current: Co2WindowTotals { total_grams: 95_000.0, distinct_days: 5 },
///     target_fraction: 0.10,
///     window_closed: false,
/// });
/// assert_eq!(evaluation.status, ChallengeStatus::Active);
/// assert_eq!(evaluation.progress_percent, Some(50.0));
/// ```
#[must_use]
pub fn evaluate(inputs: EvaluationInputs) -> Evaluation {
    let EvaluationInputs {
        reference,
        current,
        target_fraction,
        window_closed,
    } = inputs;
    let open_or_failed = if window_closed {
        ChallengeStatus::Failed
    } else {
        ChallengeStatus::Active
    };
    let reference_value = (reference.distinct_days > 0).then(|| reference.total_kg());
    let current_value = Some(current.total_kg());
    let reference_kg = reference.total_kg();

    if reference.distinct_days < MIN_REFERENCE_DAYS || reference_kg <= 0.0 {
        return Evaluation {
            status: open_or_failed,
            reference_value,
            current_value,
            target_value: target_fraction,
            progress_percent: None,
            message: INSUFFICIENT_HISTORY_MESSAGE.to_owned(),
        };
    }

    if current.distinct_days < MIN_CURRENT_DAYS {
        return Evaluation {
            status: open_or_failed,
            reference_value,
            current_value,
            target_value: target_fraction,
            progress_percent: None,
            message: NO_CURRENT_DATA_MESSAGE.to_owned(),
        };
    }

    let reduction = 1.0 - current.total_kg() / reference_kg;
    let target_met = reduction + TARGET_TOLERANCE >= target_fraction;
    let progress = if target_fraction > 0.0 {
        (reduction / target_fraction * 100.0).clamp(0.0, 100.0)
    } else if target_met {
        100.0
    } else {
        0.0
    };
    let reduction_pct = reduction * 100.0;
    let target_pct = target_fraction * 100.0;

    let (status, message) = if target_met {
        (ChallengeStatus::Success, SUCCESS_MESSAGE.to_owned())
    } else if window_closed {
        (
            ChallengeStatus::Failed,
            format!(
                "Défi terminé. Réduction CO2 obtenue : {reduction_pct:.1} %, objectif : {target_pct:.0} %."
            ),
        )
    } else {
        (
            ChallengeStatus::Active,
            format!(
                "Réduction CO2 actuelle : {reduction_pct:.1} %, objectif : {target_pct:.0} %."
            ),
        )
    };

    Evaluation {
        status,
        reference_value,
        current_value,
        target_value: target_fraction,
        progress_percent: Some(round2(progress)),
        message,
    }
}
