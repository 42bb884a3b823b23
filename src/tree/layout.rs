/// Paths of the house state inside the realtime tree.
///
/// Defaults match the paths the house firmware reads and writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeLayout {
    pub temperature: String,
    pub humidity: String,
    pub motion: String,
    pub ambient: String,
    pub lights: String,
    pub curtain_command: String,
    pub alarm_active: String,
    pub access: String,
    pub events: String,
}

impl Default for TreeLayout {
    fn default() -> Self {
        Self {
            temperature: "Sensores/temperatura".to_string(),
            humidity: "Sensores/humedad".to_string(),
            motion: "Sensores/motion".to_string(),
            ambient: "Sensores/ambiente".to_string(),
            lights: "Leds".to_string(),
            curtain_command: "Curtain/command".to_string(),
            alarm_active: "Alarm/active".to_string(),
            access: "Access".to_string(),
            events: "Eventos".to_string(),
        }
    }
}

impl TreeLayout {
    pub fn light_state(&self, index: usize) -> String {
        format!("{}/{}/state", self.lights, index)
    }

    pub fn light_pwm(&self, index: usize) -> String {
        format!("{}/{}/pwm", self.lights, index)
    }
}
