//! Static mapping from the backend's abstract field names to concrete store columns.
//!
//! Every supported service owns one or more [`FieldCatalog`]s. A catalog is paired
//! with the [`DataSource`] it describes; for `contacts` the pair depends on which of
//! `phone_number` / `email` the request asks for.

use std::fmt;

use crate::error::{PimError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Service {
    Calendar,
    Contacts,
    Reminders,
}
impl Service {
    /// Case-insensitive lookup; `alarm` and `reminder` share one service.
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "calendar" => Some(Self::Calendar),
            "contacts" => Some(Self::Contacts),
            "alarm" | "reminder" => Some(Self::Reminders),
            _ => None,
        }
    }
    pub fn name(&self) -> &'static str {
        match self {
            Self::Calendar => "calendar",
            Self::Contacts => "contacts",
            Self::Reminders => "reminder",
        }
    }
}
impl fmt::Display for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Concrete data source a catalog projects from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataSource {
    CalendarEvents,
    ContactPhones,
    ContactEmails,
    CalendarReminders,
}
impl DataSource {
    pub fn uri(&self) -> &'static str {
        match self {
            Self::CalendarEvents => "content://com.android.calendar/events",
            Self::ContactPhones => "content://com.android.contacts/data/phones",
            Self::ContactEmails => "content://com.android.contacts/data/emails",
            Self::CalendarReminders => "content://com.android.calendar/reminders",
        }
    }
    /// Table holding this source in the SQLite store.
    pub fn table(&self) -> &'static str {
        match self {
            Self::CalendarEvents => "events",
            Self::ContactPhones => "phones",
            Self::ContactEmails => "emails",
            Self::CalendarReminders => "reminders",
        }
    }
}
impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.uri())
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct FieldCatalog {
    name: &'static str,
    entries: &'static [(&'static str, &'static str)],
}
impl FieldCatalog {
    pub fn name(&self) -> &'static str {
        self.name
    }
    pub fn entries(&self) -> &'static [(&'static str, &'static str)] {
        self.entries
    }
    /// Concrete column for an abstract field, matched case-insensitively.
    pub fn column(&self, field: &str) -> Option<&'static str> {
        self.entries
            .iter()
            .find(|(abstract_name, _)| abstract_name.eq_ignore_ascii_case(field))
            .map(|(_, column)| *column)
    }
    pub fn contains(&self, field: &str) -> bool {
        self.column(field).is_some()
    }
    /// Ordered concrete columns for the requested fields. `service` is the name
    /// as the request spelled it and only shows up in errors.
    pub fn projection<S: AsRef<str>>(&self, service: &str, fields: &[S]) -> Result<Vec<&'static str>> {
        fields
            .iter()
            .map(|field| {
                let field = field.as_ref();
                self.column(field).ok_or_else(|| PimError::InvalidField {
                    field: field.to_string(),
                    service: service.to_string(),
                })
            })
            .collect()
    }
}

pub static CALENDAR: FieldCatalog = FieldCatalog {
    name: "calendar",
    entries: &[
        ("title", "title"),
        ("start_date", "dtstart"),
        ("end_date", "dtend"),
        ("description", "description"),
        ("location", "eventLocation"),
    ],
};

pub static CONTACT_PHONES: FieldCatalog = FieldCatalog {
    name: "contacts/phone",
    entries: &[("display_name", "display_name"), ("phone_number", "data1")],
};

pub static CONTACT_EMAILS: FieldCatalog = FieldCatalog {
    name: "contacts/email",
    entries: &[("display_name", "display_name"), ("email", "data1")],
};

// Phone and email both live in data1 of their own kinds; the merged view reads the phone table.
pub static CONTACTS_MERGED: FieldCatalog = FieldCatalog {
    name: "contacts/merged",
    entries: &[
        ("display_name", "display_name"),
        ("phone_number", "data1"),
        ("email", "data1"),
    ],
};

pub static REMINDERS: FieldCatalog = FieldCatalog {
    name: "reminders",
    entries: &[("event_id", "event_id"), ("minutes", "minutes"), ("method", "method")],
};

/// Picks the (source, catalog) pair for a service and the fields it was asked for.
pub fn resolve<S: AsRef<str>>(service: Service, fields: &[S]) -> (DataSource, &'static FieldCatalog) {
    match service {
        Service::Calendar => (DataSource::CalendarEvents, &CALENDAR),
        Service::Contacts => {
            let wants = |name: &str| fields.iter().any(|f| f.as_ref().eq_ignore_ascii_case(name));
            match (wants("phone_number"), wants("email")) {
                (true, false) => (DataSource::ContactPhones, &CONTACT_PHONES),
                (false, true) => (DataSource::ContactEmails, &CONTACT_EMAILS),
                _ => (DataSource::ContactPhones, &CONTACTS_MERGED),
            }
        }
        Service::Reminders => (DataSource::CalendarReminders, &REMINDERS),
    }
}
