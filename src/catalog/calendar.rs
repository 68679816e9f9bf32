use std::collections::{BTreeMap, BTreeSet};

use anyhow::Result;
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ServiceID(String);

impl ServiceID {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Clone, Debug, Default)]
pub struct Calendar {
    pub services: BTreeMap<ServiceID, Service>,
}

/// A calendar pattern: an optional weekly rule plus date exceptions. Feeds
/// that ship only calendar_dates.txt produce rule-less services.
#[derive(Clone, Debug)]
pub struct Service {
    pub service_id: ServiceID,
    pub rule: Option<ServiceRule>,
    pub added: BTreeSet<NaiveDate>,
    pub removed: BTreeSet<NaiveDate>,
}

#[derive(Clone, Debug)]
pub struct ServiceRule {
    /// Monday first.
    pub days: [bool; 7],
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl Service {
    /// Exceptions override the weekly rule in either direction.
    pub fn active_on(&self, date: NaiveDate) -> bool {
        if self.added.contains(&date) {
            return true;
        }
        if self.removed.contains(&date) {
            return false;
        }
        match &self.rule {
            Some(rule) => {
                rule.start_date <= date
                    && date <= rule.end_date
                    && rule.days[date.weekday().num_days_from_monday() as usize]
            }
            None => false,
        }
    }
}

impl Calendar {
    pub fn services_on_date(&self, date: NaiveDate) -> BTreeSet<ServiceID> {
        self.services
            .values()
            .filter(|service| service.active_on(date))
            .map(|service| service.service_id.clone())
            .collect()
    }
}

pub fn load<R: std::io::Read>(reader: R) -> Result<Calendar> {
    let mut calendar = Calendar::default();
    for rec in csv::Reader::from_reader(reader).deserialize() {
        let rec: Record = rec?;
        if calendar.services.contains_key(&rec.service_id) {
            bail!("Duplicate {:?}", rec.service_id);
        }
        calendar.services.insert(
            rec.service_id.clone(),
            Service {
                service_id: rec.service_id,
                rule: Some(ServiceRule {
                    days: [
                        rec.monday,
                        rec.tuesday,
                        rec.wednesday,
                        rec.thursday,
                        rec.friday,
                        rec.saturday,
                        rec.sunday,
                    ],
                    start_date: NaiveDate::parse_from_str(&rec.start_date, "%Y%m%d")?,
                    end_date: NaiveDate::parse_from_str(&rec.end_date, "%Y%m%d")?,
                }),
                added: BTreeSet::new(),
                removed: BTreeSet::new(),
            },
        );
    }
    Ok(calendar)
}

/// Applies calendar_dates.txt. A service that only ever appears here gets an
/// entry with no weekly rule.
pub fn load_exceptions<R: std::io::Read>(calendar: &mut Calendar, reader: R) -> Result<()> {
    for rec in csv::Reader::from_reader(reader).deserialize() {
        let rec: DateRecord = rec?;
        let date = NaiveDate::parse_from_str(&rec.date, "%Y%m%d")?;
        let service = calendar
            .services
            .entry(rec.service_id.clone())
            .or_insert_with(|| Service {
                service_id: rec.service_id,
                rule: None,
                added: BTreeSet::new(),
                removed: BTreeSet::new(),
            });
        if rec.exception_type == 1 {
            service.added.insert(date);
        } else if rec.exception_type == 2 {
            service.removed.insert(date);
        } else {
            bail!("Unknown exception_type {}", rec.exception_type);
        }
    }
    Ok(())
}

#[derive(Deserialize)]
struct Record {
    service_id: ServiceID,
    #[serde(deserialize_with = "parse_bool")]
    monday: bool,
    #[serde(deserialize_with = "parse_bool")]
    tuesday: bool,
    #[serde(deserialize_with = "parse_bool")]
    wednesday: bool,
    #[serde(deserialize_with = "parse_bool")]
    thursday: bool,
    #[serde(deserialize_with = "parse_bool")]
    friday: bool,
    #[serde(deserialize_with = "parse_bool")]
    saturday: bool,
    #[serde(deserialize_with = "parse_bool")]
    sunday: bool,
    start_date: String,
    end_date: String,
}

fn parse_bool<'de, D: Deserializer<'de>>(d: D) -> Result<bool, D::Error> {
    let n = <u8>::deserialize(d)?;
    if n == 1 {
        return Ok(true);
    }
    if n == 0 {
        return Ok(false);
    }
    Err(serde::de::Error::custom(format!("Unknown bool value {n}")))
}

#[derive(Deserialize)]
struct DateRecord {
    service_id: ServiceID,
    date: String,
    exception_type: u8,
}
