//! Navigable views of the application.
//!
//! | Route | Path |
//! |-------|------|
//! | Dashboard | `/` |
//! | Plant detail | `/plant/:id` |
//! | Manage plants | `/manage-plants` |
//! | Identify | `/identify` |
//! | Identification history | `/identifications` |

use core::fmt;
use core::str::FromStr;

use crate::error::{ParseError, ParseResult};

/// A client-side route.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Route {
    Dashboard,
    PlantDetail(String),
    ManagePlants,
    Identify,
    Identifications,
}

impl Route {
    /// Parse a path such as `/plant/abc123`.
    ///
    /// Trailing slashes and a query string are ignored.
    ///
    /// # Examples
    ///
    /// ```
    /// use vanadristi_types::Route;
    ///
    /// assert_eq!(Route::parse("/").unwrap(), Route::Dashboard);
    /// assert_eq!(Route::parse("/plant/p1").unwrap(), Route::PlantDetail("p1".into()));
    /// assert!(Route::parse("/settings").is_err());
    /// ```
    pub fn parse(path: &str) -> ParseResult<Self> {
        let without_query = path.split(['?', '#']).next().unwrap_or_default();
        let segments: Vec<&str> = without_query
            .split('/')
            .filter(|segment| !segment.is_empty())
            .collect();

        match segments.as_slice() {
            [] => Ok(Self::Dashboard),
            ["plant", id] => Ok(Self::PlantDetail((*id).to_string())),
            ["manage-plants"] => Ok(Self::ManagePlants),
            ["identify"] => Ok(Self::Identify),
            ["identifications"] => Ok(Self::Identifications),
            _ => Err(ParseError::UnknownRoute(path.to_string())),
        }
    }

    /// The canonical path for this route.
    #[must_use]
    pub fn path(&self) -> String {
        match self {
            Self::Dashboard => "/".to_string(),
            Self::PlantDetail(id) => format!("/plant/{}", id),
            Self::ManagePlants => "/manage-plants".to_string(),
            Self::Identify => "/identify".to_string(),
            Self::Identifications => "/identifications".to_string(),
        }
    }
}

impl FromStr for Route {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}
