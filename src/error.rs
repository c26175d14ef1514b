use std::fmt;

#[derive(Debug)]
pub enum RouteError {
    InvalidCoordinate { latitude: f64, longitude: f64 },
    EmptyRoute,
    InvalidConfiguration(String),
    Font(String),
    Io(std::io::Error),
}

impl fmt::Display for RouteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RouteError::InvalidCoordinate {
                latitude,
                longitude,
            } => write!(
                f,
                "invalid coordinate: latitude {} longitude {}",
                latitude, longitude
            ),
            RouteError::EmptyRoute => write!(f, "route has no waypoints to export"),
            RouteError::InvalidConfiguration(message) => {
                write!(f, "invalid configuration: {}", message)
            }
            RouteError::Font(message) => write!(f, "font error: {}", message),
            RouteError::Io(err) => write!(f, "io error: {}", err),
        }
    }
}

impl std::error::Error for RouteError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RouteError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for RouteError {
    fn from(value: std::io::Error) -> Self {
        RouteError::Io(value)
    }
}
