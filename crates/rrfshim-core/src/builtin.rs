//! Built-in alias tables for RRF-style tool commands
//!
//! Maps the RepRapFirmware fan and tool temperature commands onto the
//! tool-changer's own commands.

use crate::alias::{ChainedDispatch, CommandAlias, ParameterRule};

/// Sets the part cooling fan speed of a tool and remembers it
pub const PARTFAN_SPEED_COMMAND: &str = "KTC_SET_AND_SAVE_PARTFAN_SPEED";
/// Sets tool temperatures, timeouts and heater state
pub const SET_TEMPERATURE_COMMAND: &str = "KTC_TOOL_SET_TEMPERATURE";
/// Blocks until a tool or heater is within tolerance of its target
pub const WAIT_TEMPERATURE_COMMAND: &str = "KTC_TEMPERATURE_WAIT_WITH_TOLERANCE";

/// Heater state value meaning "active"
pub const HEATER_STATE_ACTIVE: &str = "2";

/// `M106 [P<tool>|T<tool>] [S<speed>]`
pub fn fan_speed() -> CommandAlias {
    CommandAlias::new("M106", PARTFAN_SPEED_COMMAND)
        .describe("Set part cooling fan speed")
        .rule(ParameterRule::passthrough("P"))
        .rule(ParameterRule::new("T", "P"))
        .rule(ParameterRule::passthrough("S"))
}

/// `M109 [P<tool>|T<tool>] [H<heater>] [S<temp>] [W<tolerance>]`
///
/// With S and a tool, the tool's active temperature is set (and the heater
/// made active) before waiting.
pub fn wait_temperature() -> CommandAlias {
    CommandAlias::new("M109", WAIT_TEMPERATURE_COMMAND)
        .describe("Set tool temperature and wait")
        .rule(ParameterRule::new("P", "T"))
        .rule(ParameterRule::passthrough("T"))
        .rule(ParameterRule::new("H", "HEATER"))
        .rule(ParameterRule::new("W", "TOLERANCE"))
        .chain(
            ChainedDispatch::new(SET_TEMPERATURE_COMMAND)
                .requires("S")
                .requires_any_of(["T", "P"])
                .carry("T")
                .rule(ParameterRule::new("S", "ACTV_TMP"))
                .fixed("CHNG_STATE", HEATER_STATE_ACTIVE),
        )
}

/// `M568 [P<tool>|T<tool>] [S<active>] [R<standby>] [N<standby timeout>] [O<shutdown timeout>] [A<state>]`
pub fn set_temperature() -> CommandAlias {
    CommandAlias::new("M568", SET_TEMPERATURE_COMMAND)
        .describe("Set tool temperatures and heater state")
        .rule(ParameterRule::new("P", "T"))
        .rule(ParameterRule::passthrough("T"))
        .rule(ParameterRule::new("S", "ACTV_TMP"))
        .rule(ParameterRule::new("R", "STDB_TMP"))
        .rule(ParameterRule::new("N", "STDB_TIMEOUT"))
        .rule(ParameterRule::new("O", "SHTDWN_TIMEOUT"))
        .rule(ParameterRule::new("A", "CHNG_STATE"))
}

/// All built-in alias tables
pub fn builtin_aliases() -> Vec<CommandAlias> {
    vec![fan_speed(), wait_temperature(), set_temperature()]
}
