//! Dining tables and their status transitions.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use super::{new_id, required_text, Record};
use crate::error::{Error, Result};
use crate::store::EntityKey;

/// Occupancy state of a table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableStatus {
    /// Free.
    Empty,
    /// Guests are seated.
    Occupied,
    /// Held for a reservation.
    Reserved,
}

impl TableStatus {
    /// The stored string form.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Empty => "empty",
            Self::Occupied => "occupied",
            Self::Reserved => "reserved",
        }
    }
}

impl std::fmt::Display for TableStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A dining table.
///
/// Optional fields are only present while they apply: an empty table carries
/// none of them, an occupied one carries `customer_name` and `occupied_since`,
/// a reserved one carries `customer_name` and the reservation details.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Table {
    /// Record id.
    pub id: String,
    /// Table number shown to guests; unique.
    pub number: u32,
    /// Seats.
    pub capacity: u32,
    /// Current status.
    pub status: TableStatus,
    /// Guest the table is held or seated for.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_name: Option<String>,
    /// When the current guests were seated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub occupied_since: Option<DateTime<Utc>>,
    /// Reservation day, stored as `dd/mm/yyyy`.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "reservation_date"
    )]
    pub reservation_date: Option<NaiveDate>,
    /// Reservation time, stored as `HH:MM`.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "reservation_time"
    )]
    pub reservation_time: Option<NaiveTime>,
    /// Party size for the reservation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reservation_people: Option<u32>,
}

/// Details needed to reserve a table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reservation {
    /// Name the reservation is under.
    pub customer_name: String,
    /// Party size.
    pub people: u32,
    /// Day of the visit.
    pub date: NaiveDate,
    /// Arrival time.
    pub time: NaiveTime,
}

impl Record for Table {
    const KEY: EntityKey = EntityKey::Tables;
    const ENTITY: &'static str = "table";

    fn id(&self) -> &str {
        &self.id
    }

    fn check(&self) -> Result<()> {
        self.validate()
    }
}

impl Table {
    /// Create an empty table.
    ///
    /// # Errors
    ///
    /// Returns a validation error if `number` or `capacity` is zero.
    pub fn new(number: u32, capacity: u32) -> Result<Self> {
        let table = Self {
            id: new_id(),
            number,
            capacity,
            status: TableStatus::Empty,
            customer_name: None,
            occupied_since: None,
            reservation_date: None,
            reservation_time: None,
            reservation_people: None,
        };
        table.validate()?;
        Ok(table)
    }

    /// Change the number of seats.
    ///
    /// # Errors
    ///
    /// Returns a validation error if `capacity` is zero.
    pub fn set_capacity(&mut self, capacity: u32) -> Result<()> {
        if capacity == 0 {
            return Err(Error::validation("capacity must be a positive number"));
        }
        self.capacity = capacity;
        Ok(())
    }

    /// Hold the table for a reservation. Also used to edit an existing one.
    ///
    /// # Errors
    ///
    /// Fails if the table is occupied, the name is blank or `people` is zero.
    pub fn reserve(&mut self, reservation: Reservation) -> Result<()> {
        if self.status == TableStatus::Occupied {
            return Err(self.bad_transition("reserve"));
        }
        let name = required_text("customer name", &reservation.customer_name)?;
        if reservation.people == 0 {
            return Err(Error::validation("reservation needs at least one person"));
        }

        self.clear_guest();
        self.status = TableStatus::Reserved;
        self.customer_name = Some(name);
        self.reservation_date = Some(reservation.date);
        self.reservation_time = Some(reservation.time);
        self.reservation_people = Some(reservation.people);
        Ok(())
    }

    /// Drop the reservation and free the table.
    ///
    /// # Errors
    ///
    /// Fails if the table is not reserved.
    pub fn cancel_reservation(&mut self) -> Result<()> {
        if self.status != TableStatus::Reserved {
            return Err(self.bad_transition("cancel reservation for"));
        }
        self.clear_guest();
        self.status = TableStatus::Empty;
        Ok(())
    }

    /// Seat guests at an empty or reserved table.
    ///
    /// # Errors
    ///
    /// Fails if the table is already occupied or the name is blank.
    pub fn occupy(&mut self, customer_name: &str, now: DateTime<Utc>) -> Result<()> {
        if self.status == TableStatus::Occupied {
            return Err(self.bad_transition("occupy"));
        }
        let name = required_text("customer name", customer_name)?;

        self.clear_guest();
        self.status = TableStatus::Occupied;
        self.customer_name = Some(name);
        self.occupied_since = Some(now);
        Ok(())
    }

    /// Guests have left: free the table.
    ///
    /// # Errors
    ///
    /// Fails if the table is not occupied.
    pub fn finish(&mut self) -> Result<()> {
        if self.status != TableStatus::Occupied {
            return Err(self.bad_transition("finish"));
        }
        self.clear_guest();
        self.status = TableStatus::Empty;
        Ok(())
    }

    /// Check the field invariants for the current status.
    ///
    /// # Errors
    ///
    /// Returns a validation error describing the first broken invariant.
    pub fn validate(&self) -> Result<()> {
        if self.number == 0 {
            return Err(Error::validation("table number must be a positive number"));
        }
        if self.capacity == 0 {
            return Err(Error::validation("capacity must be a positive number"));
        }

        let has_name = self
            .customer_name
            .as_deref()
            .is_some_and(|n| !n.trim().is_empty());
        let has_reservation = self.reservation_date.is_some()
            || self.reservation_time.is_some()
            || self.reservation_people.is_some();

        match self.status {
            TableStatus::Empty => {
                if self.customer_name.is_some() || self.occupied_since.is_some() || has_reservation
                {
                    return Err(Error::validation(format!(
                        "empty table {} still carries guest details",
                        self.number
                    )));
                }
            }
            TableStatus::Occupied | TableStatus::Reserved if !has_name => {
                return Err(Error::validation(format!(
                    "{} table {} needs a customer name",
                    self.status, self.number
                )));
            }
            TableStatus::Occupied if has_reservation => {
                return Err(Error::validation(format!(
                    "occupied table {} still carries reservation details",
                    self.number
                )));
            }
            TableStatus::Reserved if self.occupied_since.is_some() => {
                return Err(Error::validation(format!(
                    "reserved table {} has an occupied time",
                    self.number
                )));
            }
            TableStatus::Occupied | TableStatus::Reserved => {}
        }

        if self.reservation_people == Some(0) {
            return Err(Error::validation("reservation needs at least one person"));
        }
        Ok(())
    }

    fn clear_guest(&mut self) {
        self.customer_name = None;
        self.occupied_since = None;
        self.reservation_date = None;
        self.reservation_time = None;
        self.reservation_people = None;
    }

    fn bad_transition(&self, action: &str) -> Error {
        Error::validation(format!(
            "cannot {action} table {}: it is {}",
            self.number, self.status
        ))
    }
}

mod reservation_date {
    use chrono::NaiveDate;
    use serde::{Deserialize, Deserializer, Serializer};

    const FORMAT: &str = "%d/%m/%Y";

    pub fn serialize<S: Serializer>(value: &Option<NaiveDate>, s: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(date) => s.serialize_str(&date.format(FORMAT).to_string()),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<NaiveDate>, D::Error> {
        let Some(text) = Option::<String>::deserialize(d)? else {
            return Ok(None);
        };
        NaiveDate::parse_from_str(&text, FORMAT)
            .or_else(|_| NaiveDate::parse_from_str(&text, "%Y-%m-%d"))
            .map(Some)
            .map_err(|_| serde::de::Error::custom(format!("invalid reservation date: {text}")))
    }
}

mod reservation_time {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    const FORMAT: &str = "%H:%M";

    pub fn serialize<S: Serializer>(value: &Option<NaiveTime>, s: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(time) => s.serialize_str(&time.format(FORMAT).to_string()),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<NaiveTime>, D::Error> {
        let Some(text) = Option::<String>::deserialize(d)? else {
            return Ok(None);
        };
        NaiveTime::parse_from_str(&text, FORMAT)
            .or_else(|_| NaiveTime::parse_from_str(&text, "%H:%M:%S"))
            .map(Some)
            .map_err(|_| serde::de::Error::custom(format!("invalid reservation time: {text}")))
    }
}
