use crate::domain::{LatLng, LocationSample};
use serde::Deserialize;

/// The subset of gpsd's JSON reports the sensor cares about.
#[derive(Debug, Deserialize)]
#[serde(tag = "class")]
pub enum GpsdReport {
    #[serde(rename = "TPV")]
    Tpv(Tpv),
    #[serde(rename = "ERROR")]
    Error { message: String },
    #[serde(other)]
    Other,
}

/// Time-position-velocity report
#[derive(Debug, Deserialize)]
pub struct Tpv {
    #[serde(default)]
    pub mode: u8,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub eph: Option<f64>,
    pub epx: Option<f64>,
    pub epy: Option<f64>,
}

#[derive(Debug, PartialEq)]
pub enum Fix {
    Acquired(LocationSample),
    /// The receiver has a fix, but not a precise enough one
    Imprecise,
    Missing,
}

impl Tpv {
    pub fn fix(&self, high_accuracy: bool) -> Fix {
        let (Some(lat), Some(lon)) = (self.lat, self.lon) else {
            return Fix::Missing;
        };

        match self.mode {
            3 => Fix::Acquired(LocationSample::new(LatLng::new(lat, lon), self.accuracy())),
            2 if !high_accuracy => Fix::Acquired(LocationSample::new(LatLng::new(lat, lon), self.accuracy())),
            2 => Fix::Imprecise,
            _ => Fix::Missing,
        }
    }

    fn accuracy(&self) -> Option<f64> {
        self.eph.or_else(|| match (self.epx, self.epy) {
            (Some(x), Some(y)) => Some(x.max(y)),
            (x, y) => x.or(y),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn tpv(json: &str) -> Tpv {
        match serde_json::from_str::<GpsdReport>(json) {
            Ok(GpsdReport::Tpv(tpv)) => tpv,
            other => panic!("expected a TPV report, found {:?}", other),
        }
    }

    #[test]
    fn deserializes_the_report_classes() -> Result<(), serde_json::Error> {
        let version = serde_json::from_str::<GpsdReport>(r#"{"class":"VERSION","release":"3.25","proto_major":3}"#)?;
        let error = serde_json::from_str::<GpsdReport>(r#"{"class":"ERROR","message":"Unrecognized request"}"#)?;

        assert!(matches!(version, GpsdReport::Other));
        assert!(matches!(error, GpsdReport::Error { message } if message == "Unrecognized request"));
        Ok(())
    }

    #[rstest]
    #[case(r#"{"class":"TPV","mode":3,"lat":37.7749,"lon":-122.4194,"eph":4.5}"#, true, Fix::Acquired(LocationSample::new(LatLng::new(37.7749, -122.4194), Some(4.5))))]
    #[case(r#"{"class":"TPV","mode":2,"lat":1.0,"lon":2.0,"epx":3.0,"epy":7.0}"#, false, Fix::Acquired(LocationSample::new(LatLng::new(1.0, 2.0), Some(7.0))))]
    #[case(r#"{"class":"TPV","mode":2,"lat":1.0,"lon":2.0}"#, true, Fix::Imprecise)]
    #[case(r#"{"class":"TPV","mode":1}"#, false, Fix::Missing)]
    #[case(r#"{"class":"TPV","mode":0,"lat":1.0,"lon":2.0}"#, false, Fix::Missing)]
    #[case(r#"{"class":"TPV","mode":3,"lat":1.0}"#, false, Fix::Missing)]
    fn maps_a_tpv_to_a_fix(#[case] json: &str, #[case] high_accuracy: bool, #[case] expected: Fix) {
        assert_eq!(tpv(json).fix(high_accuracy), expected);
    }
}
