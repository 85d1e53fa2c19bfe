use chrono::SubsecRound;

use crate::limits::*;
use crate::model::*;

use super::EngineError;

fn check_len(field: &'static str, value: &str, min: usize, max: usize) -> Result<(), EngineError> {
    let len = value.chars().count();
    if len < min || len > max {
        return Err(EngineError::validation(
            field,
            format!("length must be between {min} and {max} characters, got {len}"),
        ));
    }
    Ok(())
}

pub fn validate_table(new: &NewTable) -> Result<(), EngineError> {
    check_len("name", &new.name, MIN_TABLE_NAME_LEN, MAX_TABLE_NAME_LEN)?;
    check_len("location", &new.location, MIN_LOCATION_LEN, MAX_LOCATION_LEN)?;
    if new.seats < MIN_SEATS {
        return Err(EngineError::validation(
            "seats",
            format!("must be at least {MIN_SEATS}"),
        ));
    }
    Ok(())
}

/// Checks attribute bounds and returns the request with its start truncated
/// to millisecond precision, the resolution spans are compared at.
pub fn validate_reservation(mut new: NewReservation) -> Result<NewReservation, EngineError> {
    check_len(
        "customer_name",
        &new.customer_name,
        MIN_CUSTOMER_NAME_LEN,
        MAX_CUSTOMER_NAME_LEN,
    )?;
    if new.duration_minutes < MIN_DURATION_MINUTES {
        return Err(EngineError::validation(
            "duration_minutes",
            "must be greater than 0",
        ));
    }
    new.reservation_time = new.reservation_time.trunc_subsecs(3);
    let duration = chrono::Duration::minutes(i64::from(new.duration_minutes));
    if new.reservation_time.checked_add_signed(duration).is_none() {
        return Err(EngineError::validation(
            "reservation_time",
            "reservation ends outside the representable time range",
        ));
    }
    Ok(new)
}
