use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Category {
    RoadClosure,
    DogBite,
    Hazard,
    Other,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::RoadClosure,
        Category::DogBite,
        Category::Hazard,
        Category::Other,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::RoadClosure => "ROAD_CLOSURE",
            Self::DogBite => "DOG_BITE",
            Self::Hazard => "HAZARD",
            Self::Other => "OTHER",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown category {0:?}, expected one of ROAD_CLOSURE, DOG_BITE, HAZARD, OTHER")]
pub struct UnknownCategory(pub String);

impl FromStr for Category {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|category| category.as_str() == s)
            .ok_or_else(|| UnknownCategory(s.to_string()))
    }
}
