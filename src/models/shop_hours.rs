use chrono::{FixedOffset, NaiveTime, Offset, Utc, Weekday};

/// Opening policy of the shop. All booking arithmetic happens in shop-local
/// time at `utc_offset`.
#[derive(Debug, Clone, PartialEq)]
pub struct ShopHours {
    pub open: NaiveTime,
    pub close: NaiveTime,
    pub closed_days: Vec<Weekday>,
    pub slot_step_minutes: i64,
    pub lookahead_days: u32,
    pub utc_offset: FixedOffset,
}

impl Default for ShopHours {
    fn default() -> Self {
        Self {
            open: NaiveTime::from_hms_opt(9, 0, 0).unwrap_or_default(),
            close: NaiveTime::from_hms_opt(17, 0, 0).unwrap_or_default(),
            closed_days: vec![Weekday::Sun],
            slot_step_minutes: 15,
            lookahead_days: 30,
            utc_offset: Utc.fix(),
        }
    }
}

impl ShopHours {
    /// Builds hours from their textual form, e.g. `("09:00", "17:00", "sun", "+03:00")`.
    pub fn parse(
        open: &str,
        close: &str,
        closed_days: &str,
        utc_offset: &str,
        slot_step_minutes: i64,
        lookahead_days: u32,
    ) -> anyhow::Result<Self> {
        let open = parse_time(open)?;
        let close = parse_time(close)?;
        if open >= close {
            return Err(anyhow::anyhow!("shop opens at {open} but closes at {close}"));
        }
        if slot_step_minutes <= 0 {
            return Err(anyhow::anyhow!("slot step must be positive, got {slot_step_minutes}"));
        }

        let closed_days = closed_days
            .split(',')
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .map(parse_weekday)
            .collect::<anyhow::Result<Vec<_>>>()?;

        Ok(Self {
            open,
            close,
            closed_days,
            slot_step_minutes,
            lookahead_days,
            utc_offset: parse_offset(utc_offset)?,
        })
    }

    pub fn working_minutes(&self) -> i64 {
        (self.close - self.open).num_minutes()
    }

    pub fn is_closed_day(&self, day: Weekday) -> bool {
        self.closed_days.contains(&day)
    }

    pub fn to_human_readable(&self) -> String {
        let hours = format!("{}-{}", self.open.format("%H:%M"), self.close.format("%H:%M"));
        if self.closed_days.is_empty() {
            return hours;
        }

        let mut days = self.closed_days.clone();
        days.sort_by_key(|d| d.num_days_from_monday());
        let days = days
            .iter()
            .map(|d| d.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        format!("{hours}, closed {days}")
    }
}

fn parse_weekday(s: &str) -> anyhow::Result<Weekday> {
    match s.to_lowercase().as_str() {
        "mon" => Ok(Weekday::Mon),
        "tue" => Ok(Weekday::Tue),
        "wed" => Ok(Weekday::Wed),
        "thu" => Ok(Weekday::Thu),
        "fri" => Ok(Weekday::Fri),
        "sat" => Ok(Weekday::Sat),
        "sun" => Ok(Weekday::Sun),
        _ => Err(anyhow::anyhow!("invalid weekday: {s}")),
    }
}

fn parse_time(s: &str) -> anyhow::Result<NaiveTime> {
    NaiveTime::parse_from_str(s.trim(), "%H:%M").map_err(|_| anyhow::anyhow!("invalid time: {s}"))
}

fn parse_offset(s: &str) -> anyhow::Result<FixedOffset> {
    let s = s.trim();
    if s.eq_ignore_ascii_case("z") || s.eq_ignore_ascii_case("utc") {
        return Ok(Utc.fix());
    }
    s.parse::<FixedOffset>()
        .map_err(|e| anyhow::anyhow!("invalid utc offset {s}: {e}"))
}
