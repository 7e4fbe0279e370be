use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::DomainError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub u64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BusinessType {
    Kirana,
    Supermarket,
    Wholesale,
    Distributor,
    Retailer,
    Restaurant,
}

impl BusinessType {
    pub const ALL: [BusinessType; 6] = [
        Self::Kirana,
        Self::Supermarket,
        Self::Wholesale,
        Self::Distributor,
        Self::Retailer,
        Self::Restaurant,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Kirana => "kirana",
            Self::Supermarket => "supermarket",
            Self::Wholesale => "wholesale",
            Self::Distributor => "distributor",
            Self::Retailer => "retailer",
            Self::Restaurant => "restaurant",
        }
    }
}

impl fmt::Display for BusinessType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for BusinessType {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "kirana" => Ok(Self::Kirana),
            "supermarket" => Ok(Self::Supermarket),
            "wholesale" | "wholesaler" => Ok(Self::Wholesale),
            "distributor" => Ok(Self::Distributor),
            "retailer" | "retail" => Ok(Self::Retailer),
            "restaurant" => Ok(Self::Restaurant),
            other => Err(DomainError::InvalidValue {
                field: "business_type",
                value: other.to_string(),
            }),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Location {
    pub city: String,
    pub state: String,
}

impl Location {
    pub fn new(city: impl Into<String>, state: impl Into<String>) -> Self {
        Self { city: city.into(), state: state.into() }
    }

    pub fn same_city(&self, other: &Location) -> bool {
        self.city.eq_ignore_ascii_case(&other.city) && self.same_state(other)
    }

    pub fn same_state(&self, other: &Location) -> bool {
        self.state.eq_ignore_ascii_case(&other.state)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusinessProfile {
    pub id: UserId,
    pub business_name: String,
    pub business_type: BusinessType,
    pub location: Location,
    pub registered_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::{BusinessType, Location};

    #[test]
    fn business_type_parses_aliases() {
        assert_eq!("Kirana".parse::<BusinessType>().ok(), Some(BusinessType::Kirana));
        assert_eq!("wholesaler".parse::<BusinessType>().ok(), Some(BusinessType::Wholesale));
        assert!("bakery".parse::<BusinessType>().is_err());
    }

    #[test]
    fn business_type_round_trips_through_str() {
        for business_type in BusinessType::ALL {
            assert_eq!(business_type.as_str().parse::<BusinessType>().ok(), Some(business_type));
        }
    }

    #[test]
    fn same_city_requires_matching_state() {
        let mumbai = Location::new("Mumbai", "Maharashtra");
        assert!(mumbai.same_city(&Location::new("mumbai", "maharashtra")));
        assert!(!mumbai.same_city(&Location::new("Pune", "Maharashtra")));
        assert!(mumbai.same_state(&Location::new("Pune", "Maharashtra")));
        assert!(!mumbai.same_city(&Location::new("Mumbai", "Delhi")));
    }
}
