//! `Date`, backed by `chrono`.
//!
//! A date is a time value in epoch milliseconds, `NaN` when invalid. Local
//! time is UTC, so the local and `UTC` accessors agree. `Date.now()` reads
//! the interpreter's clock, which advances with the virtual timers.

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, Timelike, Utc};

use crate::error::EvalResult;
use crate::interpreter::Interpreter;
use crate::ops::{to_integer, Hint};
use crate::value::{CallArgs, JsValue, NativeFn, Obj, Object, ObjectKind};

const MS_PER_DAY: f64 = 86_400_000.0;
/// ±100 000 000 days around the epoch.
const MAX_TIME: f64 = 8.64e15;

pub(super) fn install(interp: &mut Interpreter) {
    let proto = interp.realm.date_prototype.clone();
    let ctor = interp.make_constructor("Date", 7, date, &proto);
    interp.define_method(&ctor, "now", 0, now);
    interp.define_method(&ctor, "parse", 1, parse);
    interp.define_method(&ctor, "UTC", 7, utc);

    let methods: &[(&str, usize, NativeFn)] = &[
        ("getTime", 0, get_time),
        ("valueOf", 0, get_time),
        ("getFullYear", 0, get_full_year),
        ("getMonth", 0, get_month),
        ("getDate", 0, get_date),
        ("getDay", 0, get_day),
        ("getHours", 0, get_hours),
        ("getMinutes", 0, get_minutes),
        ("getSeconds", 0, get_seconds),
        ("getMilliseconds", 0, get_milliseconds),
        ("getUTCFullYear", 0, get_full_year),
        ("getUTCMonth", 0, get_month),
        ("getUTCDate", 0, get_date),
        ("getUTCDay", 0, get_day),
        ("getUTCHours", 0, get_hours),
        ("getUTCMinutes", 0, get_minutes),
        ("getUTCSeconds", 0, get_seconds),
        ("getUTCMilliseconds", 0, get_milliseconds),
        ("getTimezoneOffset", 0, get_timezone_offset),
        ("setTime", 1, set_time),
        ("setFullYear", 3, set_full_year),
        ("setMonth", 2, set_month),
        ("setDate", 1, set_date),
        ("setHours", 4, set_hours),
        ("setMinutes", 3, set_minutes),
        ("setSeconds", 2, set_seconds),
        ("setMilliseconds", 1, set_milliseconds),
        ("setUTCFullYear", 3, set_full_year),
        ("setUTCMonth", 2, set_month),
        ("setUTCDate", 1, set_date),
        ("setUTCHours", 4, set_hours),
        ("setUTCMinutes", 3, set_minutes),
        ("setUTCSeconds", 2, set_seconds),
        ("setUTCMilliseconds", 1, set_milliseconds),
        ("toISOString", 0, to_iso_string),
        ("toJSON", 1, to_json),
        ("toString", 0, to_string),
        ("toDateString", 0, to_date_string),
        ("toTimeString", 0, to_time_string),
        ("toUTCString", 0, to_utc_string),
        ("toLocaleDateString", 0, to_locale_date_string),
        ("toLocaleTimeString", 0, to_locale_time_string),
        ("toLocaleString", 0, to_locale_string),
    ];
    for &(name, arity, func) in methods {
        interp.define_method(&proto, name, arity, func);
    }
    interp.define_global("Date", JsValue::Object(ctor));
}

// ── Time values ───────────────────────────────────────────────────────────────

/// TimeClip: whole milliseconds inside the representable range, else `NaN`.
fn time_clip(time: f64) -> f64 {
    if !time.is_finite() || time.abs() > MAX_TIME {
        return f64::NAN;
    }
    to_integer(time) + 0.0
}

fn to_datetime(time: f64) -> Option<DateTime<Utc>> {
    if time.is_nan() {
        return None;
    }
    DateTime::from_timestamp_millis(time as i64)
}

/// Broken-down fields of a valid time value.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Fields {
    year: f64,
    /// Zero-based.
    month: f64,
    day: f64,
    hours: f64,
    minutes: f64,
    seconds: f64,
    millis: f64,
}

impl Fields {
    fn of(time: f64) -> Option<Self> {
        let dt = to_datetime(time)?;
        Some(Self {
            year: f64::from(dt.year()),
            month: f64::from(dt.month0()),
            day: f64::from(dt.day()),
            hours: f64::from(dt.hour()),
            minutes: f64::from(dt.minute()),
            seconds: f64::from(dt.second()),
            millis: f64::from(dt.timestamp_subsec_millis()),
        })
    }

    /// MakeDate: fields out of range carry into the next larger unit, so
    /// month 12 is January of the following year and day 0 the last day of
    /// the previous month.
    fn time(&self) -> f64 {
        let parts = [
            self.year,
            self.month,
            self.day,
            self.hours,
            self.minutes,
            self.seconds,
            self.millis,
        ];
        if parts.iter().any(|part| !part.is_finite()) {
            return f64::NAN;
        }
        let year = to_integer(self.year) + (to_integer(self.month) / 12.0).floor();
        let month = to_integer(self.month).rem_euclid(12.0);
        let Some(first) = first_of_month(year, month) else {
            return f64::NAN;
        };
        let day = first + to_integer(self.day) - 1.0;
        let within = to_integer(self.hours) * 3_600_000.0
            + to_integer(self.minutes) * 60_000.0
            + to_integer(self.seconds) * 1000.0
            + to_integer(self.millis);
        day * MS_PER_DAY + within
    }
}

/// Days from the epoch to the first of `month` (zero-based) in `year`.
fn first_of_month(year: f64, month: f64) -> Option<f64> {
    if year.abs() > 400_000.0 {
        return None;
    }
    let first = NaiveDate::from_ymd_opt(year as i32, month as u32 + 1, 1)?;
    let epoch = NaiveDate::from_ymd_opt(1970, 1, 1)?;
    Some(first.signed_duration_since(epoch).num_days() as f64)
}

/// The fields named by constructor-style arguments: year, month, then
/// optional day (1), hours, minutes, seconds, milliseconds (0). Years 0
/// to 99 mean 1900 to 1999.
fn fields_from_args(interp: &mut Interpreter, args: &[JsValue]) -> EvalResult<Fields> {
    let mut numbers = [f64::NAN, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0];
    for (slot, arg) in numbers.iter_mut().zip(args) {
        *slot = interp.to_number(arg)?;
    }
    let [mut year, month, day, hours, minutes, seconds, millis] = numbers;
    if year.is_finite() {
        let whole = to_integer(year);
        if (0.0..=99.0).contains(&whole) {
            year = 1900.0 + whole;
        }
    }
    Ok(Fields {
        year,
        month,
        day,
        hours,
        minutes,
        seconds,
        millis,
    })
}

/// Date.parse: ISO 8601 (date-only forms are UTC, as are date-times
/// without an offset here), RFC 3339 and RFC 2822. Anything else is `NaN`.
fn parse_time(text: &str) -> f64 {
    let text = text.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return time_clip(dt.timestamp_millis() as f64);
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(text) {
        return time_clip(dt.timestamp_millis() as f64);
    }
    let naive = text.strip_suffix('Z').unwrap_or(text);
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(naive, format) {
            return time_clip(dt.and_utc().timestamp_millis() as f64);
        }
    }
    let date = NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(&format!("{text}-01"), "%Y-%m-%d"))
        .or_else(|_| NaiveDate::parse_from_str(&format!("{text}-01-01"), "%Y-%m-%d"));
    match date {
        Ok(date) if text.len() >= 4 => date
            .and_hms_opt(0, 0, 0)
            .map_or(f64::NAN, |dt| time_clip(dt.and_utc().timestamp_millis() as f64)),
        _ => f64::NAN,
    }
}

impl Interpreter {
    fn new_date(&self, time: f64, proto: Obj) -> Obj {
        Obj::new(Object::new(ObjectKind::Date(time_clip(time)), Some(proto)))
    }

    /// ISO 8601 text of a date object, for console output and export.
    /// `None` for an invalid date.
    pub(crate) fn date_iso(time: f64) -> Option<String> {
        to_datetime(time).map(|dt| dt.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string())
    }
}

// ── Constructor and statics ───────────────────────────────────────────────────

fn date(interp: &mut Interpreter, call: &CallArgs) -> EvalResult<JsValue> {
    let Some(target) = &call.new_target else {
        return Ok(JsValue::from(format_date(interp.current_time(), FULL)));
    };
    let time = match call.args.as_slice() {
        [] => interp.current_time(),
        [value] => match date_value(value) {
            Some(time) => time,
            None => match interp.to_primitive(value, Hint::Default)? {
                JsValue::String(text) => parse_time(&text),
                primitive => interp.to_number(&primitive)?,
            },
        },
        args => fields_from_args(interp, args)?.time(),
    };
    let fallback = interp.realm.date_prototype.clone();
    let proto = interp.prototype_for(target, Some(&fallback))?;
    Ok(JsValue::Object(interp.new_date(time, proto)))
}

fn date_value(value: &JsValue) -> Option<f64> {
    match value.as_object()?.borrow().kind {
        ObjectKind::Date(time) => Some(time),
        _ => None,
    }
}

fn now(interp: &mut Interpreter, _call: &CallArgs) -> EvalResult<JsValue> {
    Ok(JsValue::Number(interp.current_time()))
}

fn parse(interp: &mut Interpreter, call: &CallArgs) -> EvalResult<JsValue> {
    let text = interp.to_string(&call.arg(0))?;
    Ok(JsValue::Number(parse_time(&text)))
}

fn utc(interp: &mut Interpreter, call: &CallArgs) -> EvalResult<JsValue> {
    let fields = fields_from_args(interp, &call.args)?;
    Ok(JsValue::Number(time_clip(fields.time())))
}

// ── Getters ───────────────────────────────────────────────────────────────────

fn this_date(interp: &Interpreter, call: &CallArgs) -> EvalResult<(Obj, f64)> {
    if let Some(obj) = call.this.as_object() {
        if let ObjectKind::Date(time) = obj.borrow().kind {
            return Ok((obj.clone(), time));
        }
    }
    Err(interp.type_error("this is not a Date object."))
}

fn this_time(interp: &Interpreter, call: &CallArgs) -> EvalResult<f64> {
    this_date(interp, call).map(|(_, time)| time)
}

/// One broken-down field of the receiver; `NaN` for an invalid date.
fn field(interp: &Interpreter, call: &CallArgs, pick: fn(&Fields) -> f64) -> EvalResult<JsValue> {
    let time = this_time(interp, call)?;
    Ok(JsValue::Number(Fields::of(time).map_or(f64::NAN, |fields| pick(&fields))))
}

fn get_time(interp: &mut Interpreter, call: &CallArgs) -> EvalResult<JsValue> {
    this_time(interp, call).map(JsValue::Number)
}

fn get_full_year(interp: &mut Interpreter, call: &CallArgs) -> EvalResult<JsValue> {
    field(interp, call, |f| f.year)
}

fn get_month(interp: &mut Interpreter, call: &CallArgs) -> EvalResult<JsValue> {
    field(interp, call, |f| f.month)
}

fn get_date(interp: &mut Interpreter, call: &CallArgs) -> EvalResult<JsValue> {
    field(interp, call, |f| f.day)
}

fn get_day(interp: &mut Interpreter, call: &CallArgs) -> EvalResult<JsValue> {
    let time = this_time(interp, call)?;
    let weekday = to_datetime(time).map_or(f64::NAN, |dt| {
        f64::from(dt.weekday().num_days_from_sunday())
    });
    Ok(JsValue::Number(weekday))
}

fn get_hours(interp: &mut Interpreter, call: &CallArgs) -> EvalResult<JsValue> {
    field(interp, call, |f| f.hours)
}

fn get_minutes(interp: &mut Interpreter, call: &CallArgs) -> EvalResult<JsValue> {
    field(interp, call, |f| f.minutes)
}

fn get_seconds(interp: &mut Interpreter, call: &CallArgs) -> EvalResult<JsValue> {
    field(interp, call, |f| f.seconds)
}

fn get_milliseconds(interp: &mut Interpreter, call: &CallArgs) -> EvalResult<JsValue> {
    field(interp, call, |f| f.millis)
}

fn get_timezone_offset(interp: &mut Interpreter, call: &CallArgs) -> EvalResult<JsValue> {
    let time = this_time(interp, call)?;
    Ok(JsValue::Number(if time.is_nan() { f64::NAN } else { 0.0 }))
}

// ── Setters ───────────────────────────────────────────────────────────────────

fn store(obj: &Obj, time: f64) -> JsValue {
    let time = time_clip(time);
    if let ObjectKind::Date(slot) = &mut obj.borrow_mut().kind {
        *slot = time;
    }
    JsValue::Number(time)
}

fn set_time(interp: &mut Interpreter, call: &CallArgs) -> EvalResult<JsValue> {
    let (obj, _) = this_date(interp, call)?;
    let time = interp.to_number(&call.arg(0))?;
    Ok(store(&obj, time))
}

/// Overwrite consecutive fields starting at `first` with the arguments
/// given. Setting the year of an invalid date starts from the epoch; any
/// other setter leaves it invalid.
fn set_fields(
    interp: &mut Interpreter,
    call: &CallArgs,
    first: usize,
    max: usize,
) -> EvalResult<JsValue> {
    let (obj, time) = this_date(interp, call)?;
    let base = if time.is_nan() && first == 0 { 0.0 } else { time };
    let mut values = Vec::with_capacity(max);
    for arg in call.args.iter().take(max.max(1)) {
        values.push(interp.to_number(arg)?);
    }
    if values.is_empty() {
        values.push(f64::NAN);
    }
    let Some(mut fields) = Fields::of(base) else {
        return Ok(JsValue::Number(f64::NAN));
    };
    let slots = [
        &mut fields.year,
        &mut fields.month,
        &mut fields.day,
        &mut fields.hours,
        &mut fields.minutes,
        &mut fields.seconds,
        &mut fields.millis,
    ];
    for (slot, value) in slots.into_iter().skip(first).zip(values) {
        *slot = value;
    }
    Ok(store(&obj, fields.time()))
}

fn set_full_year(interp: &mut Interpreter, call: &CallArgs) -> EvalResult<JsValue> {
    set_fields(interp, call, 0, 3)
}

fn set_month(interp: &mut Interpreter, call: &CallArgs) -> EvalResult<JsValue> {
    set_fields(interp, call, 1, 2)
}

fn set_date(interp: &mut Interpreter, call: &CallArgs) -> EvalResult<JsValue> {
    set_fields(interp, call, 2, 1)
}

fn set_hours(interp: &mut Interpreter, call: &CallArgs) -> EvalResult<JsValue> {
    set_fields(interp, call, 3, 4)
}

fn set_minutes(interp: &mut Interpreter, call: &CallArgs) -> EvalResult<JsValue> {
    set_fields(interp, call, 4, 3)
}

fn set_seconds(interp: &mut Interpreter, call: &CallArgs) -> EvalResult<JsValue> {
    set_fields(interp, call, 5, 2)
}

fn set_milliseconds(interp: &mut Interpreter, call: &CallArgs) -> EvalResult<JsValue> {
    set_fields(interp, call, 6, 1)
}

// ── Formatting ────────────────────────────────────────────────────────────────

const FULL: &str = "%a %b %d %Y %H:%M:%S GMT+0000 (Coordinated Universal Time)";

fn format_date(time: f64, format: &str) -> String {
    match to_datetime(time) {
        Some(dt) => dt.format(format).to_string(),
        None => "Invalid Date".to_string(),
    }
}

fn formatted(interp: &Interpreter, call: &CallArgs, format: &str) -> EvalResult<JsValue> {
    let time = this_time(interp, call)?;
    Ok(JsValue::from(format_date(time, format)))
}

fn to_iso_string(interp: &mut Interpreter, call: &CallArgs) -> EvalResult<JsValue> {
    let time = this_time(interp, call)?;
    match Interpreter::date_iso(time) {
        Some(text) => Ok(JsValue::from(text)),
        None => Err(interp.range_error("Invalid time value")),
    }
}

fn to_json(interp: &mut Interpreter, call: &CallArgs) -> EvalResult<JsValue> {
    let time = this_time(interp, call)?;
    Ok(Interpreter::date_iso(time).map_or(JsValue::Null, JsValue::from))
}

fn to_string(interp: &mut Interpreter, call: &CallArgs) -> EvalResult<JsValue> {
    formatted(interp, call, FULL)
}

fn to_date_string(interp: &mut Interpreter, call: &CallArgs) -> EvalResult<JsValue> {
    formatted(interp, call, "%a %b %d %Y")
}

fn to_time_string(interp: &mut Interpreter, call: &CallArgs) -> EvalResult<JsValue> {
    formatted(interp, call, "%H:%M:%S GMT+0000 (Coordinated Universal Time)")
}

fn to_utc_string(interp: &mut Interpreter, call: &CallArgs) -> EvalResult<JsValue> {
    formatted(interp, call, "%a, %d %b %Y %H:%M:%S GMT")
}

fn to_locale_date_string(interp: &mut Interpreter, call: &CallArgs) -> EvalResult<JsValue> {
    formatted(interp, call, "%-m/%-d/%Y")
}

fn to_locale_time_string(interp: &mut Interpreter, call: &CallArgs) -> EvalResult<JsValue> {
    formatted(interp, call, "%-I:%M:%S %p")
}

fn to_locale_string(interp: &mut Interpreter, call: &CallArgs) -> EvalResult<JsValue> {
    formatted(interp, call, "%-m/%-d/%Y, %-I:%M:%S %p")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn iso_strings_parse_to_utc_milliseconds() {
        assert_eq!(parse_time("1970-01-01T00:00:00Z"), 0.0);
        assert_eq!(parse_time("1970-01-02"), MS_PER_DAY);
        assert_eq!(parse_time("2000-01-01T00:00:00.250+01:00"), 946_681_200_250.0);
        assert_eq!(parse_time("2024-02"), parse_time("2024-02-01"));
        assert_eq!(parse_time("2024"), parse_time("2024-01-01T00:00"));
        assert!(parse_time("yesterday").is_nan());
        assert!(parse_time("").is_nan());
    }

    #[test]
    fn out_of_range_fields_carry() {
        let fields = |year, month, day| Fields {
            year,
            month,
            day,
            hours: 0.0,
            minutes: 0.0,
            seconds: 0.0,
            millis: 0.0,
        };
        assert_eq!(fields(2023.0, 12.0, 1.0).time(), parse_time("2024-01-01"));
        assert_eq!(fields(2024.0, 2.0, 0.0).time(), parse_time("2024-02-29"));
        assert_eq!(fields(2024.0, -1.0, 1.0).time(), parse_time("2023-12-01"));
        assert!(fields(f64::NAN, 0.0, 1.0).time().is_nan());
    }

    #[test]
    fn fields_round_trip_through_chrono() {
        let time = parse_time("2021-07-04T12:34:56.789Z");
        let fields = Fields::of(time).expect("valid date");
        assert_eq!((fields.year, fields.month, fields.day), (2021.0, 6.0, 4.0));
        assert_eq!(fields.millis, 789.0);
        assert_eq!(fields.time(), time);
    }

    #[test]
    fn time_clip_rejects_far_dates() {
        assert!(time_clip(9e15).is_nan());
        assert!(time_clip(f64::INFINITY).is_nan());
        assert_eq!(time_clip(1.9), 1.0);
        assert_eq!(Interpreter::date_iso(0.0).as_deref(), Some("1970-01-01T00:00:00.000Z"));
        assert_eq!(Interpreter::date_iso(f64::NAN), None);
    }
}
