use rand::Rng;
use serde::Serialize;

/// Event envelope posted to the receiver.
#[derive(Debug, Clone, Serialize)]
pub struct Event {
    #[serde(rename = "type")]
    pub event_type: &'static str,
    pub source_uuid: String,
    pub data: Measurement,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Measurement {
    pub data_format: i64,
    pub temperature: f64,
    pub humidity: f64,
    pub pressure: i64,
    pub acceleration: Acceleration,
    pub battery: i64,
    #[serde(rename = "TXPower")]
    pub tx_power: i64,
    pub movement: i64,
    pub sequence: i64,
    #[serde(rename = "MAC")]
    pub mac: String,
    #[serde(rename = "RSSI")]
    pub rssi: i64,
    pub address: String,
    pub local_name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Acceleration {
    #[serde(rename = "X")]
    pub x: i64,
    #[serde(rename = "Y")]
    pub y: i64,
    #[serde(rename = "Z")]
    pub z: i64,
}

/// A simulated RuuviTag with a stable identity and its own counters.
#[derive(Debug)]
pub struct Device {
    pub source_uuid: String,
    pub mac: String,
    sequence: i64,
    movement: i64,
}

impl Device {
    pub fn random(rng: &mut impl Rng) -> Self {
        let octets: Vec<String> = (0..6).map(|_| format!("{:02X}", rng.gen::<u8>())).collect();
        Self {
            source_uuid: uuid::Uuid::new_v4().to_string(),
            mac: octets.join(":"),
            sequence: rng.gen_range(0..60000),
            movement: rng.gen_range(0..200),
        }
    }

    pub fn next_event(&mut self, rng: &mut impl Rng) -> Event {
        self.sequence = (self.sequence + 1) % 65535;
        if rng.gen_bool(0.02) {
            self.movement = (self.movement + 1) % 255;
        }

        let temperature = if rng.gen_bool(0.05) {
            rng.gen_range(-40.0..85.0) // 5% outliers
        } else {
            rng.gen_range(15.0..35.0) // Normal range
        };

        Event {
            event_type: "new_measurement",
            source_uuid: self.source_uuid.clone(),
            data: Measurement {
                data_format: 5,
                temperature: (temperature * 1000.0_f64).round() / 1000.0,
                humidity: (rng.gen_range(20.0..80.0_f64) * 1000.0).round() / 1000.0,
                pressure: rng.gen_range(95000..105000),
                acceleration: Acceleration {
                    x: rng.gen_range(-50..50),
                    y: rng.gen_range(-50..50),
                    z: rng.gen_range(950..1100),
                },
                battery: if rng.gen_bool(0.02) {
                    rng.gen_range(1800..2400) // 2% low battery
                } else {
                    rng.gen_range(2400..3100)
                },
                tx_power: 4,
                movement: self.movement,
                sequence: self.sequence,
                mac: self.mac.clone(),
                rssi: rng.gen_range(-95..-40),
                address: self.mac.clone(),
                local_name: String::new(),
            },
        }
    }
}

/// Serializes an event, optionally dropping one measurement field so the
/// receiver rejects it.
pub fn encode(event: &Event, incomplete: bool, rng: &mut impl Rng) -> serde_json::Result<String> {
    let mut value = serde_json::to_value(event)?;
    if incomplete {
        if let Some(data) = value.get_mut("data").and_then(|d| d.as_object_mut()) {
            let keys: Vec<String> = data.keys().cloned().collect();
            let key = &keys[rng.gen_range(0..keys.len())];
            data.remove(key);
        }
    }
    serde_json::to_string(&value)
}
