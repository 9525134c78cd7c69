use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// Status recorded for a single prayer on a given day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrayerStatus {
    #[default]
    Pending,
    OnTime,
    Jamaat,
    Qaza,
    Missed,
}

impl PrayerStatus {
    pub const ALL: [PrayerStatus; 5] = [
        PrayerStatus::Pending,
        PrayerStatus::OnTime,
        PrayerStatus::Jamaat,
        PrayerStatus::Qaza,
        PrayerStatus::Missed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PrayerStatus::Pending => "pending",
            PrayerStatus::OnTime => "on_time",
            PrayerStatus::Jamaat => "jamaat",
            PrayerStatus::Qaza => "qaza",
            PrayerStatus::Missed => "missed",
        }
    }

    /// Maps any client-supplied status onto the taxonomy.
    ///
    /// Legacy values are remapped (`late` -> `on_time`, `skipped` -> `missed`)
    /// and anything unrecognized collapses to `pending`.
    pub fn normalize(raw: &str) -> Self {
        let raw = raw.trim().to_lowercase();
        let mapped = match raw.as_str() {
            "late" => "on_time",
            "skipped" => "missed",
            other => other,
        };
        mapped.parse().unwrap_or_default()
    }

    /// Like [`PrayerStatus::normalize`], for untyped JSON values.
    pub fn from_value(value: Option<&Value>) -> Self {
        match value {
            None | Some(Value::Null) => PrayerStatus::Pending,
            Some(Value::String(s)) => Self::normalize(s),
            Some(Value::Bool(b)) => Self::normalize(&b.to_string()),
            Some(Value::Number(n)) => Self::normalize(&n.to_string()),
            Some(_) => PrayerStatus::Pending,
        }
    }

    /// `on_time` and `jamaat` count towards discipline and streaks.
    pub fn is_positive(&self) -> bool {
        matches!(self, PrayerStatus::OnTime | PrayerStatus::Jamaat)
    }

    pub fn is_tracked(&self) -> bool {
        *self != PrayerStatus::Pending
    }
}

impl fmt::Display for PrayerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PrayerStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(PrayerStatus::Pending),
            "on_time" => Ok(PrayerStatus::OnTime),
            "jamaat" => Ok(PrayerStatus::Jamaat),
            "qaza" => Ok(PrayerStatus::Qaza),
            "missed" => Ok(PrayerStatus::Missed),
            _ => Err(format!(
                "Invalid prayer status '{}'. Valid options: pending, on_time, jamaat, qaza, missed",
                s
            )),
        }
    }
}

/// The five daily prayers, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Prayer {
    Fajr,
    Dhuhr,
    Asr,
    Maghrib,
    Isha,
}

impl Prayer {
    pub const ALL: [Prayer; 5] = [
        Prayer::Fajr,
        Prayer::Dhuhr,
        Prayer::Asr,
        Prayer::Maghrib,
        Prayer::Isha,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Prayer::Fajr => "fajr",
            Prayer::Dhuhr => "dhuhr",
            Prayer::Asr => "asr",
            Prayer::Maghrib => "maghrib",
            Prayer::Isha => "isha",
        }
    }
}

impl fmt::Display for Prayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Prayer {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "fajr" => Ok(Prayer::Fajr),
            "dhuhr" => Ok(Prayer::Dhuhr),
            "asr" => Ok(Prayer::Asr),
            "maghrib" => Ok(Prayer::Maghrib),
            "isha" => Ok(Prayer::Isha),
            _ => Err(format!(
                "Invalid prayer '{}'. Valid options: fajr, dhuhr, asr, maghrib, isha",
                s
            )),
        }
    }
}

/// One row of the prayer log: the five statuses for a calendar day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrayerDay {
    pub date: NaiveDate,
    pub fajr: PrayerStatus,
    pub dhuhr: PrayerStatus,
    pub asr: PrayerStatus,
    pub maghrib: PrayerStatus,
    pub isha: PrayerStatus,
}

impl PrayerDay {
    /// A day with nothing recorded yet.
    pub fn pending(date: NaiveDate) -> Self {
        Self {
            date,
            fajr: PrayerStatus::Pending,
            dhuhr: PrayerStatus::Pending,
            asr: PrayerStatus::Pending,
            maghrib: PrayerStatus::Pending,
            isha: PrayerStatus::Pending,
        }
    }

    /// Reads the five statuses out of a JSON object, normalizing each one.
    pub fn from_payload(date: NaiveDate, payload: &Value) -> Self {
        let mut day = Self::pending(date);
        for prayer in Prayer::ALL {
            day.set(prayer, PrayerStatus::from_value(payload.get(prayer.as_str())));
        }
        day
    }

    pub fn status(&self, prayer: Prayer) -> PrayerStatus {
        match prayer {
            Prayer::Fajr => self.fajr,
            Prayer::Dhuhr => self.dhuhr,
            Prayer::Asr => self.asr,
            Prayer::Maghrib => self.maghrib,
            Prayer::Isha => self.isha,
        }
    }

    pub fn set(&mut self, prayer: Prayer, status: PrayerStatus) {
        match prayer {
            Prayer::Fajr => self.fajr = status,
            Prayer::Dhuhr => self.dhuhr = status,
            Prayer::Asr => self.asr = status,
            Prayer::Maghrib => self.maghrib = status,
            Prayer::Isha => self.isha = status,
        }
    }

    pub fn statuses(&self) -> [PrayerStatus; 5] {
        [self.fajr, self.dhuhr, self.asr, self.maghrib, self.isha]
    }

    pub fn positive_count(&self) -> usize {
        self.statuses().iter().filter(|s| s.is_positive()).count()
    }

    /// All five prayers prayed on time or in congregation.
    pub fn is_perfect(&self) -> bool {
        self.positive_count() == Prayer::ALL.len()
    }
}
