pub mod admin_user;
pub mod constable;
pub mod duty;
pub mod serde_helpers;
pub mod station;

pub use admin_user::AdminUser;
pub use constable::Constable;
pub use duty::Duty;
pub use station::Station;

use std::str::FromStr;

use crate::error::UnknownEntity;
use crate::status::parse_date;

/// Which administered collection a command or screen works on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Stations,
    Constables,
    Duties,
    Admins,
}

impl EntityKind {
    pub const ALL: [EntityKind; 4] = [
        EntityKind::Stations,
        EntityKind::Constables,
        EntityKind::Duties,
        EntityKind::Admins,
    ];

    pub fn collection(self) -> &'static str {
        use crate::record::Record;
        match self {
            EntityKind::Stations => Station::COLLECTION,
            EntityKind::Constables => Constable::COLLECTION,
            EntityKind::Duties => Duty::COLLECTION,
            EntityKind::Admins => AdminUser::COLLECTION,
        }
    }
}

impl FromStr for EntityKind {
    type Err = UnknownEntity;

    /// Case-insensitive; singular names are accepted. Anything else is an
    /// error so a typo never picks a collection.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "stations" | "station" => Ok(EntityKind::Stations),
            "constables" | "constable" => Ok(EntityKind::Constables),
            "duties" | "duty" => Ok(EntityKind::Duties),
            "admins" | "admin" | "admin_users" => Ok(EntityKind::Admins),
            _ => Err(UnknownEntity(s.to_string())),
        }
    }
}

fn text(value: &Option<String>) -> String {
    value.clone().unwrap_or_default()
}

/// Wire date shown as `YYYY-MM-DD` when parseable, verbatim otherwise.
fn display_date(value: &Option<String>) -> String {
    match value.as_deref() {
        Some(v) => parse_date(v)
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| v.to_string()),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entity_names_parse() {
        assert_eq!("duties".parse::<EntityKind>().unwrap(), EntityKind::Duties);
        assert_eq!("Constables".parse::<EntityKind>().unwrap(), EntityKind::Constables);
        assert_eq!("station".parse::<EntityKind>().unwrap(), EntityKind::Stations);
        assert_eq!(" admins ".parse::<EntityKind>().unwrap(), EntityKind::Admins);
        for kind in EntityKind::ALL {
            assert_eq!(kind.collection().parse::<EntityKind>().unwrap(), kind);
        }
    }

    #[test]
    fn unknown_entity_is_rejected() {
        for name in ["dutys", "", "police"] {
            let err = name.parse::<EntityKind>().unwrap_err();
            assert_eq!(err.0, name);
        }
        assert!("dutys".parse::<EntityKind>().unwrap_err().to_string().contains("dutys"));
    }
}
