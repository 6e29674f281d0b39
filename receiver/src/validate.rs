use crate::errors::Result;
use crate::model::{Acceleration, IngressEvent, Measurement, MeasurementPayload};

/// Decodes a request body into an ingress envelope.
pub fn decode_event(raw: &[u8]) -> Result<IngressEvent> {
    Ok(serde_json::from_slice(raw)?)
}

/// Decodes the `data` of a `new_measurement` event.
pub fn decode_measurement(raw: &[u8]) -> Result<MeasurementPayload> {
    Ok(serde_json::from_slice(raw)?)
}

impl MeasurementPayload {
    /// True when every field, including each acceleration axis, was present.
    ///
    /// This only checks presence, not ranges.
    pub fn is_complete(&self) -> bool {
        self.missing_field().is_none()
    }

    /// Name of the first absent field, if any.
    pub fn missing_field(&self) -> Option<&'static str> {
        let acceleration = self.acceleration.as_ref();
        [
            ("DataFormat", self.data_format.is_some()),
            ("Temperature", self.temperature.is_some()),
            ("Humidity", self.humidity.is_some()),
            ("Pressure", self.pressure.is_some()),
            ("Acceleration", acceleration.is_some()),
            ("Acceleration.X", acceleration.map_or(true, |a| a.x.is_some())),
            ("Acceleration.Y", acceleration.map_or(true, |a| a.y.is_some())),
            ("Acceleration.Z", acceleration.map_or(true, |a| a.z.is_some())),
            ("Battery", self.battery.is_some()),
            ("TXPower", self.tx_power.is_some()),
            ("Movement", self.movement.is_some()),
            ("Sequence", self.sequence.is_some()),
            ("MAC", self.mac.is_some()),
            ("RSSI", self.rssi.is_some()),
            ("Address", self.address.is_some()),
            ("LocalName", self.local_name.is_some()),
        ]
        .into_iter()
        .find_map(|(name, present)| (!present).then_some(name))
    }

    /// Converts into a [`Measurement`], or names the first absent field.
    pub fn into_complete(self) -> std::result::Result<Measurement, &'static str> {
        let acceleration = self.acceleration.ok_or("Acceleration")?;
        Ok(Measurement {
            data_format: self.data_format.ok_or("DataFormat")?,
            temperature: self.temperature.ok_or("Temperature")?,
            humidity: self.humidity.ok_or("Humidity")?,
            pressure: self.pressure.ok_or("Pressure")?,
            acceleration: Acceleration {
                x: acceleration.x.ok_or("Acceleration.X")?,
                y: acceleration.y.ok_or("Acceleration.Y")?,
                z: acceleration.z.ok_or("Acceleration.Z")?,
            },
            battery: self.battery.ok_or("Battery")?,
            tx_power: self.tx_power.ok_or("TXPower")?,
            movement: self.movement.ok_or("Movement")?,
            sequence: self.sequence.ok_or("Sequence")?,
            mac: self.mac.ok_or("MAC")?,
            rssi: self.rssi.ok_or("RSSI")?,
            address: self.address.ok_or("Address")?,
            local_name: self.local_name.ok_or("LocalName")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    const TOP_LEVEL_FIELDS: [&str; 13] = [
        "DataFormat",
        "Temperature",
        "Humidity",
        "Pressure",
        "Acceleration",
        "Battery",
        "TXPower",
        "Movement",
        "Sequence",
        "MAC",
        "RSSI",
        "Address",
        "LocalName",
    ];

    fn full_measurement() -> Value {
        json!({
            "DataFormat": 5,
            "Temperature": 22.34,
            "Humidity": 42.975,
            "Pressure": 97465,
            "Acceleration": {"X": -8, "Y": -20, "Z": 1056},
            "Battery": 2857,
            "TXPower": 4,
            "Movement": 75,
            "Sequence": 6256,
            "MAC": "E8:D3:AD:C4:6E:18",
            "RSSI": -75,
            "Address": "E8:D3:AD:C4:6E:18",
            "LocalName": ""
        })
    }

    fn decode_value(value: &Value) -> MeasurementPayload {
        decode_measurement(value.to_string().as_bytes()).unwrap()
    }

    #[test]
    fn test_all_fields_present_is_complete() {
        let payload = decode_value(&full_measurement());
        assert!(payload.is_complete());

        let measurement = payload.into_complete().unwrap();
        assert_eq!(measurement.pressure, 97465);
        assert_eq!(measurement.acceleration.z, 1056);
        assert_eq!(measurement.local_name, "");
    }

    #[test]
    fn test_each_missing_field_is_incomplete() {
        for field in TOP_LEVEL_FIELDS {
            let mut value = full_measurement();
            value.as_object_mut().unwrap().remove(field);

            let payload = decode_value(&value);
            assert!(!payload.is_complete(), "missing {} accepted", field);
            assert_eq!(payload.into_complete().err(), Some(field));
        }
    }

    #[test]
    fn test_each_missing_axis_is_incomplete() {
        for axis in ["X", "Y", "Z"] {
            let mut value = full_measurement();
            value["Acceleration"].as_object_mut().unwrap().remove(axis);

            let payload = decode_value(&value);
            assert!(!payload.is_complete(), "missing axis {} accepted", axis);
            let expected = format!("Acceleration.{}", axis);
            assert_eq!(payload.into_complete().err(), Some(expected.as_str()));
        }
    }

    #[test]
    fn test_zero_values_are_present() {
        let value = json!({
            "DataFormat": 0,
            "Temperature": 0.0,
            "Humidity": 0.0,
            "Pressure": 0,
            "Acceleration": {"X": 0, "Y": 0, "Z": 0},
            "Battery": 0,
            "TXPower": 0,
            "Movement": 0,
            "Sequence": 0,
            "MAC": "",
            "RSSI": 0,
            "Address": "",
            "LocalName": ""
        });

        assert!(decode_value(&value).is_complete());
    }

    #[test]
    fn test_null_field_is_absent() {
        let mut value = full_measurement();
        value["Battery"] = Value::Null;

        assert!(!decode_value(&value).is_complete());
    }

    #[test]
    fn test_empty_object_is_incomplete() {
        let payload = decode_measurement(b"{}").unwrap();
        assert_eq!(payload, MeasurementPayload::default());
        assert!(!payload.is_complete());
    }

    #[test]
    fn test_wrong_field_type_is_decode_error() {
        let mut value = full_measurement();
        value["Pressure"] = json!("high");
        assert!(decode_measurement(value.to_string().as_bytes()).is_err());

        let mut value = full_measurement();
        value["Sequence"] = json!(1.5);
        assert!(decode_measurement(value.to_string().as_bytes()).is_err());
    }

    #[test]
    fn test_unknown_fields_are_ignored() {
        let mut value = full_measurement();
        value["Firmware"] = json!("3.31.1");

        assert!(decode_value(&value).is_complete());
    }

    #[test]
    fn test_keys_are_case_sensitive() {
        let mut value = full_measurement();
        let temperature = value.as_object_mut().unwrap().remove("Temperature").unwrap();
        value["temperature"] = temperature;

        let payload = decode_value(&value);
        assert_eq!(payload.missing_field(), Some("Temperature"));
    }

    #[test]
    fn test_trailing_bytes_are_decode_error() {
        let mut raw = full_measurement().to_string().into_bytes();
        raw.extend_from_slice(b" garbage");
        assert!(decode_measurement(&raw).is_err());

        assert!(decode_event(br#"{"type":"new_measurement"} {}"#).is_err());
        assert!(decode_event(b"{\"type\":\"new_measurement\"}\n").is_ok());
    }

    #[test]
    fn test_decode_event_defaults() {
        let event = decode_event(br#"{"data":{}}"#).unwrap();
        assert_eq!(event.event_type, "");
        assert_eq!(event.source_uuid, "");
        assert_eq!(event.data.unwrap().get(), "{}");

        let event = decode_event(br#"{"type":"new_measurement","source_uuid":"abc"}"#).unwrap();
        assert!(event.data.is_none());
    }

    #[test]
    fn test_decode_event_malformed() {
        assert!(decode_event(b"not json").is_err());
        assert!(decode_event(b"").is_err());
        assert!(decode_event(br#"{"type": 5}"#).is_err());
    }
}
