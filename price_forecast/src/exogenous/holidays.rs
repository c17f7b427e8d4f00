//! Spanish public holiday calendar
//!
//! National holidays apply everywhere; regional ones are keyed by the
//! ISO 3166-2:ES subdivision code of the province's autonomous community.

use super::{Covariate, DateRange, ExogenousSource, FillPolicy};
use crate::data::normalize_province;
use crate::error::Result;
use chrono::{Datelike, Duration, NaiveDate};
use std::collections::BTreeMap;

/// Fixed-date national holidays as (month, day)
const NATIONAL_FIXED: [(u32, u32); 9] = [
    (1, 1),
    (1, 6),
    (5, 1),
    (8, 15),
    (10, 12),
    (11, 1),
    (12, 6),
    (12, 8),
    (12, 25),
];

/// Province (accent-folded, lower case) to autonomous community code
const PROVINCE_SUBDIVISIONS: [(&str, &str); 52] = [
    ("almeria", "AN"),
    ("cadiz", "AN"),
    ("cordoba", "AN"),
    ("granada", "AN"),
    ("huelva", "AN"),
    ("jaen", "AN"),
    ("malaga", "AN"),
    ("sevilla", "AN"),
    ("huesca", "AR"),
    ("teruel", "AR"),
    ("zaragoza", "AR"),
    ("asturias", "AS"),
    ("balears (illes)", "IB"),
    ("illes balears", "IB"),
    ("las palmas", "CN"),
    ("palmas (las)", "CN"),
    ("santa cruz de tenerife", "CN"),
    ("cantabria", "CB"),
    ("avila", "CL"),
    ("burgos", "CL"),
    ("leon", "CL"),
    ("palencia", "CL"),
    ("salamanca", "CL"),
    ("segovia", "CL"),
    ("soria", "CL"),
    ("valladolid", "CL"),
    ("zamora", "CL"),
    ("albacete", "CM"),
    ("ciudad real", "CM"),
    ("cuenca", "CM"),
    ("guadalajara", "CM"),
    ("toledo", "CM"),
    ("barcelona", "CT"),
    ("girona", "CT"),
    ("lleida", "CT"),
    ("tarragona", "CT"),
    ("alicante", "VC"),
    ("castellon", "VC"),
    ("valencia", "VC"),
    ("badajoz", "EX"),
    ("caceres", "EX"),
    ("coruña (a)", "GA"),
    ("a coruña", "GA"),
    ("lugo", "GA"),
    ("ourense", "GA"),
    ("pontevedra", "GA"),
    ("madrid", "MD"),
    ("murcia", "MC"),
    ("navarra", "NC"),
    ("bizkaia", "PV"),
    ("gipuzkoa", "PV"),
    ("araba", "PV"),
];

/// Provinces listed under an alternative official name
const PROVINCE_ALIASES: [(&str, &str); 8] = [
    ("vizcaya", "PV"),
    ("guipuzcoa", "PV"),
    ("alava", "PV"),
    ("rioja (la)", "RI"),
    ("la rioja", "RI"),
    ("ceuta", "CE"),
    ("melilla", "ML"),
    ("baleares", "IB"),
];

/// Movable feasts relative to Easter Sunday
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EasterFeast {
    HolyThursday,
    EasterMonday,
}

/// Community holidays: fixed (month, day) dates and Easter-relative feasts
fn regional_rules(subdivision: &str) -> (&'static [(u32, u32)], &'static [EasterFeast]) {
    use EasterFeast::*;
    match subdivision {
        "AN" => (&[(2, 28)], &[HolyThursday]),
        "AR" => (&[(4, 23)], &[HolyThursday]),
        "AS" => (&[(9, 8)], &[HolyThursday]),
        "CB" => (&[(7, 28)], &[HolyThursday]),
        "CE" => (&[(9, 2)], &[HolyThursday]),
        "CL" => (&[(4, 23)], &[HolyThursday]),
        "CM" => (&[(5, 31)], &[HolyThursday]),
        "CN" => (&[(5, 30)], &[HolyThursday]),
        "CT" => (&[(6, 24), (9, 11), (12, 26)], &[EasterMonday]),
        "EX" => (&[(9, 8)], &[HolyThursday]),
        "GA" => (&[(5, 17), (7, 25)], &[HolyThursday]),
        "IB" => (&[(3, 1), (12, 26)], &[HolyThursday, EasterMonday]),
        "MC" => (&[(6, 9)], &[HolyThursday]),
        "MD" => (&[(5, 2)], &[HolyThursday]),
        "ML" => (&[(9, 17)], &[HolyThursday]),
        "NC" => (&[(12, 3)], &[HolyThursday, EasterMonday]),
        "PV" => (&[(7, 25)], &[HolyThursday, EasterMonday]),
        "RI" => (&[(6, 9)], &[HolyThursday]),
        "VC" => (&[(3, 19), (10, 9)], &[EasterMonday]),
        _ => (&[], &[]),
    }
}

/// Holiday membership calendar for one province
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HolidayCalendar {
    subdivision: Option<&'static str>,
}

impl HolidayCalendar {
    /// National holidays only
    pub fn national() -> Self {
        Self { subdivision: None }
    }

    /// Calendar for a province; unknown provinces get national holidays only
    pub fn for_province(province: &str) -> Self {
        Self {
            subdivision: subdivision_for(province),
        }
    }

    pub fn subdivision(&self) -> Option<&'static str> {
        self.subdivision
    }

    pub fn is_holiday(&self, date: NaiveDate) -> bool {
        let (month, day) = (date.month(), date.day());
        if NATIONAL_FIXED.contains(&(month, day)) {
            return true;
        }

        let easter = easter_sunday(date.year());
        if easter.is_some_and(|e| date == e - Duration::days(2)) {
            return true;
        }

        let Some(code) = self.subdivision else {
            return false;
        };
        let (fixed, feasts) = regional_rules(code);
        if fixed.contains(&(month, day)) {
            return true;
        }
        feasts.iter().any(|feast| {
            easter.is_some_and(|e| match feast {
                EasterFeast::HolyThursday => date == e - Duration::days(3),
                EasterFeast::EasterMonday => date == e + Duration::days(1),
            })
        })
    }
}

impl ExogenousSource for HolidayCalendar {
    fn covariate(&self) -> Covariate {
        Covariate::IsHoliday
    }

    fn fill_policy(&self) -> FillPolicy {
        FillPolicy::Membership
    }

    fn fetch(&self, range: DateRange) -> Result<BTreeMap<NaiveDate, f64>> {
        Ok(range
            .start
            .iter_days()
            .take_while(|d| *d <= range.end)
            .filter(|d| self.is_holiday(*d))
            .map(|d| (d, 1.0))
            .collect())
    }
}

/// Autonomous community code of a province name, accents and case ignored
pub fn subdivision_for(province: &str) -> Option<&'static str> {
    let key = fold(&normalize_province(province));
    PROVINCE_SUBDIVISIONS
        .iter()
        .chain(PROVINCE_ALIASES.iter())
        .find(|(name, _)| *name == key)
        .map(|(_, code)| *code)
}

fn fold(raw: &str) -> String {
    raw.trim()
        .to_lowercase()
        .chars()
        .map(|c| match c {
            'á' | 'à' => 'a',
            'é' | 'è' => 'e',
            'í' | 'ì' => 'i',
            'ó' | 'ò' => 'o',
            'ú' | 'ü' => 'u',
            c => c,
        })
        .collect()
}

/// Gregorian Easter Sunday (anonymous algorithm)
pub fn easter_sunday(year: i32) -> Option<NaiveDate> {
    let a = year % 19;
    let b = year / 100;
    let c = year % 100;
    let d = b / 4;
    let e = b % 4;
    let f = (b + 8) / 25;
    let g = (b - f + 1) / 3;
    let h = (19 * a + b - d - g + 15) % 30;
    let i = c / 4;
    let k = c % 4;
    let l = (32 + 2 * e + 2 * i - h - k) % 7;
    let m = (a + 11 * h + 22 * l) / 451;
    let month = (h + l - 7 * m + 114) / 31;
    let day = (h + l - 7 * m + 114) % 31 + 1;
    NaiveDate::from_ymd_opt(year, month as u32, day as u32)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    #[test]
    fn test_easter_dates() {
        assert_eq!(easter_sunday(2024), Some(day("2024-03-31")));
        assert_eq!(easter_sunday(2025), Some(day("2025-04-20")));
    }

    #[test]
    fn test_national_holidays() {
        let calendar = HolidayCalendar::national();
        assert!(calendar.is_holiday(day("2024-12-25")));
        assert!(calendar.is_holiday(day("2024-03-29"))); // Good Friday
        assert!(!calendar.is_holiday(day("2024-03-28")));
        assert!(!calendar.is_holiday(day("2024-07-25")));
    }

    #[test]
    fn test_regional_holidays() {
        let madrid = HolidayCalendar::for_province("Madrid");
        assert_eq!(madrid.subdivision(), Some("MD"));
        assert!(madrid.is_holiday(day("2024-05-02")));
        assert!(madrid.is_holiday(day("2024-03-28"))); // Holy Thursday

        let barcelona = HolidayCalendar::for_province("BARCELONA");
        assert!(barcelona.is_holiday(day("2024-09-11")));
        assert!(barcelona.is_holiday(day("2024-04-01"))); // Easter Monday
        assert!(!barcelona.is_holiday(day("2024-03-28")));
    }

    #[test]
    fn test_province_lookup_folds_accents() {
        assert_eq!(subdivision_for("Cádiz"), Some("AN"));
        assert_eq!(subdivision_for("Castellón/Castelló"), Some("VC"));
        assert_eq!(subdivision_for("Atlantis"), None);
        assert_eq!(HolidayCalendar::for_province("Atlantis"), HolidayCalendar::national());
    }

    #[test]
    fn test_fetch_lists_member_dates() {
        let calendar = HolidayCalendar::national();
        let range = DateRange::new(day("2024-12-20"), day("2024-12-31"));
        let members = calendar.fetch(range).unwrap();
        assert_eq!(members.keys().copied().collect::<Vec<_>>(), vec![day("2024-12-25")]);
    }
}
