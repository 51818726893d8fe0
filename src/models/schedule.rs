//! Modelo de Schedule
//!
//! Este módulo contiene la ventana de tiempo semiabierta `[start, end)` y
//! las reservas (schedules) que cuelgan de cada vehículo.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::utils::errors::{AppError, AppResult};
use crate::utils::validation::parse_instant;

/// Ventana de tiempo `[start, end)` siempre normalizada a UTC.
///
/// Solo se construye a través de [`TimeWindow::new`] o [`TimeWindow::parse`],
/// así que toda instancia cumple `start < end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct TimeWindow {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl TimeWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> AppResult<Self> {
        if start >= end {
            return Err(AppError::InvalidWindow(format!(
                "start {} must be before end {}",
                start.to_rfc3339(),
                end.to_rfc3339()
            )));
        }
        Ok(Self { start, end })
    }

    /// Parsear dos timestamps RFC 3339 y validar la ventana
    pub fn parse(start: &str, end: &str) -> AppResult<Self> {
        let start = parse_instant("start", start)?;
        let end = parse_instant("end", end)?;
        Self::new(start, end)
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    /// Dos ventanas se solapan si `a.start < b.end && a.end > b.start`.
    /// Ventanas que solo se tocan (`a.end == b.start`) no se solapan.
    pub fn overlaps(&self, other: &TimeWindow) -> bool {
        self.start < other.end && self.end > other.start
    }

    /// Primera reserva que choca con esta ventana, si existe
    pub fn first_conflict<'a>(&self, schedules: &'a [Schedule]) -> Option<&'a Schedule> {
        schedules.iter().find(|s| s.window.overlaps(self))
    }

    pub fn is_free_against(&self, schedules: &[Schedule]) -> bool {
        self.first_conflict(schedules).is_none()
    }
}

/// Una reserva sobre un vehículo
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Schedule {
    pub booking_id: i64,
    #[serde(flatten)]
    pub window: TimeWindow,
}

impl Schedule {
    pub fn new(booking_id: i64, window: TimeWindow) -> Self {
        Self { booking_id, window }
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.window.start()
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.window.end()
    }
}

#[derive(Deserialize)]
struct RawWindow {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl<'de> Deserialize<'de> for TimeWindow {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = RawWindow::deserialize(deserializer)?;
        TimeWindow::new(raw.start, raw.end).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use rand::Rng;

    fn at(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 10, hour, minute, 0).unwrap()
    }

    fn window(start: (u32, u32), end: (u32, u32)) -> TimeWindow {
        TimeWindow::new(at(start.0, start.1), at(end.0, end.1)).unwrap()
    }

    #[test]
    fn test_touching_windows_do_not_overlap() {
        let morning = window((9, 0), (11, 0));
        let late_morning = window((11, 0), (12, 0));

        assert!(!morning.overlaps(&late_morning));
        assert!(!late_morning.overlaps(&morning));
    }

    #[test]
    fn test_partial_and_contained_overlap() {
        let booked = window((9, 0), (11, 0));

        assert!(booked.overlaps(&window((10, 0), (12, 0))));
        assert!(booked.overlaps(&window((8, 0), (9, 30))));
        assert!(booked.overlaps(&window((9, 30), (10, 0))));
        assert!(booked.overlaps(&window((7, 0), (13, 0))));
        assert!(!booked.overlaps(&window((7, 0), (9, 0))));
    }

    #[test]
    fn test_overlap_is_symmetric_for_random_windows() {
        let mut rng = rand::thread_rng();
        let base = at(0, 0);

        for _ in 0..2_000 {
            let a_start = rng.gen_range(0..600);
            let a_len = rng.gen_range(1..120);
            let b_start = rng.gen_range(0..600);
            let b_len = rng.gen_range(1..120);

            let a = TimeWindow::new(
                base + Duration::minutes(a_start),
                base + Duration::minutes(a_start + a_len),
            )
            .unwrap();
            let b = TimeWindow::new(
                base + Duration::minutes(b_start),
                base + Duration::minutes(b_start + b_len),
            )
            .unwrap();

            assert_eq!(a.overlaps(&b), b.overlaps(&a), "a={:?} b={:?}", a, b);
        }
    }

    #[test]
    fn test_empty_or_reversed_window_is_rejected() {
        assert!(matches!(
            TimeWindow::new(at(10, 0), at(10, 0)),
            Err(AppError::InvalidWindow(_))
        ));
        assert!(matches!(
            TimeWindow::new(at(11, 0), at(10, 0)),
            Err(AppError::InvalidWindow(_))
        ));
    }

    #[test]
    fn test_parse_normalizes_offsets_to_utc() {
        // 17:00 en Singapur son las 09:00 UTC
        let parsed = TimeWindow::parse("2025-01-10T17:00:00+08:00", "2025-01-10T19:00:00+08:00").unwrap();
        assert_eq!(parsed, window((9, 0), (11, 0)));

        let booked = window((10, 0), (12, 0));
        assert!(parsed.overlaps(&booked));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(matches!(
            TimeWindow::parse("mañana", "2025-01-10T19:00:00Z"),
            Err(AppError::InvalidWindow(_))
        ));
    }

    #[test]
    fn test_first_conflict_picks_overlapping_schedule() {
        let schedules = vec![
            Schedule::new(1, window((7, 0), (8, 0))),
            Schedule::new(2, window((9, 0), (11, 0))),
        ];

        let conflict = window((10, 0), (12, 0)).first_conflict(&schedules);
        assert_eq!(conflict.map(|s| s.booking_id), Some(2));
        assert!(window((11, 0), (12, 0)).is_free_against(&schedules));
    }

    #[test]
    fn test_deserialize_rejects_invalid_window() {
        let ok: Result<TimeWindow, _> = serde_json::from_str(
            r#"{"start":"2025-01-10T09:00:00Z","end":"2025-01-10T10:00:00Z"}"#,
        );
        assert!(ok.is_ok());

        let reversed: Result<TimeWindow, _> = serde_json::from_str(
            r#"{"start":"2025-01-10T11:00:00Z","end":"2025-01-10T10:00:00Z"}"#,
        );
        assert!(reversed.is_err());
    }
}
