//! Mock device implementations for testing and development.
//!
//! Each mock comes with a handle: keypad and sensor handles drive the device,
//! actuator and alarm handles observe what the node did with it.

pub mod actuator;
pub mod alarm;
pub mod keypad;
pub mod sensor;

pub use actuator::{ActuatorCommand, MockActuator, MockActuatorHandle};
pub use alarm::{AlarmToggle, MockAlarm, MockAlarmHandle};
pub use keypad::{MockKeypad, MockKeypadHandle};
pub use sensor::{MockSensor, MockSensorHandle, SimulatedSensor};
