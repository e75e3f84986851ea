//! Delivery
//!
//! Delivery addresses come from the customer's saved-address collection. When the
//! storefront configures a delivery zone, checkout only accepts addresses located
//! within its radius.

use async_trait::async_trait;
use mockall::automock;
use thiserror::Error;
use tracing::{info, warn};

use crate::retry::{RetryPolicy, retry};

const EARTH_RADIUS_KM: f64 = 6371.0;

/// A point on the globe, in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinates {
    /// Latitude
    pub latitude: f64,

    /// Longitude
    pub longitude: f64,
}

impl Coordinates {
    /// Great-circle distance in kilometres (haversine).
    pub fn distance_km(&self, other: &Self) -> f64 {
        let lat1 = self.latitude.to_radians();
        let lat2 = other.latitude.to_radians();
        let d_lat = (other.latitude - self.latitude).to_radians();
        let d_lon = (other.longitude - self.longitude).to_radians();

        let a = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);

        2.0 * EARTH_RADIUS_KM * a.sqrt().atan2((1.0 - a).sqrt())
    }
}

/// A saved delivery address.
#[derive(Debug, Clone, PartialEq)]
pub struct DeliveryAddress {
    /// Customer's name for the address, e.g. "Home"
    pub label: String,

    /// Street line
    pub line1: String,

    /// City
    pub city: String,

    /// Postal code
    pub postal_code: String,

    /// Geocoded position; `None` when entered manually and never located
    pub coordinates: Option<Coordinates>,
}

/// Reasons an address cannot be delivered to.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum DeliveryError {
    /// The address has no coordinates to check against the delivery zone.
    #[error("we couldn't locate {0}, pick the address on the map to continue")]
    NotLocated(String),

    /// The address is beyond the delivery radius.
    #[error("{label} is {distance_km:.1} km away, we only deliver within {radius_km:.1} km")]
    OutsideZone {
        /// Address label
        label: String,
        /// Distance from the store
        distance_km: f64,
        /// Delivery radius
        radius_km: f64,
    },
}

/// Circle around the store that orders can be delivered within.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DeliveryZone {
    /// Store location
    pub origin: Coordinates,

    /// Radius in kilometres
    pub radius_km: f64,
}

impl DeliveryZone {
    /// Whether a point lies within the radius (inclusive).
    pub fn contains(&self, point: &Coordinates) -> bool {
        self.origin.distance_km(point) <= self.radius_km
    }

    /// Check that an address can be delivered to.
    ///
    /// # Errors
    ///
    /// Returns [`DeliveryError::NotLocated`] for addresses without coordinates and
    /// [`DeliveryError::OutsideZone`] for addresses beyond the radius.
    pub fn check(&self, address: &DeliveryAddress) -> Result<(), DeliveryError> {
        let point = address
            .coordinates
            .ok_or_else(|| DeliveryError::NotLocated(address.label.clone()))?;

        let distance_km = self.origin.distance_km(&point);

        if distance_km > self.radius_km {
            return Err(DeliveryError::OutsideZone {
                label: address.label.clone(),
                distance_km,
                radius_km: self.radius_km,
            });
        }

        Ok(())
    }
}

/// Geocoding failures
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GeocodeError {
    /// Lookup service unreachable or timed out.
    #[error("location lookup unavailable: {0}")]
    Unavailable(String),

    /// The customer declined location access.
    #[error("location access denied")]
    PermissionDenied,
}

impl GeocodeError {
    /// Whether retrying could succeed.
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

/// Geocoding service contract.
#[automock]
#[async_trait]
pub trait Geocoder: Send + Sync {
    /// Resolve a free-text address to coordinates, `None` when nothing matched.
    async fn geocode(&self, query: &str) -> Result<Option<Coordinates>, GeocodeError>;
}

/// Locate an address, retrying transient failures under `policy`.
///
/// Never fails: when the lookup is exhausted or refused the customer falls back
/// to entering the address manually, signalled by `None`.
#[tracing::instrument(name = "delivery.locate", skip(geocoder))]
pub async fn locate(geocoder: &dyn Geocoder, query: &str, policy: RetryPolicy) -> Option<Coordinates> {
    let result = retry(policy, "geocode", GeocodeError::is_transient, || {
        geocoder.geocode(query)
    })
    .await;

    match result {
        Ok(Some(point)) => Some(point),
        Ok(None) => {
            info!("no match for address, falling back to manual entry");
            None
        }
        Err(error) => {
            warn!(%error, "geolocation failed, falling back to manual entry");
            None
        }
    }
}
