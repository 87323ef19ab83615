#[derive(Debug, Clone, Copy)]
pub struct Tag {
    pub key: &'static str,
    pub metric: &'static str,
}

pub const MOTOR_TEMP_C: Tag = Tag {
    key: "motor_temp_c",
    metric: "thermal_bench_motor_temperature_celsius",
};

pub const TEMP_RISE_C: Tag = Tag {
    key: "temp_rise_c",
    metric: "thermal_bench_temperature_rise_celsius",
};

pub const WATT_LOSS_W: Tag = Tag {
    key: "watt_loss_w",
    metric: "thermal_bench_power_loss_watts",
};

pub const TIME_CONSTANT_H: Tag = Tag {
    key: "time_constant_h",
    metric: "thermal_bench_time_constant_hours",
};

pub const MAX_TEMP_RISE_C: Tag = Tag {
    key: "max_temp_rise_c",
    metric: "thermal_bench_max_temperature_rise_celsius",
};

pub const SHAFT_POWER_KW: Tag = Tag {
    key: "shaft_power_kw",
    metric: "thermal_bench_shaft_power_kilowatts",
};

pub const EFFICIENCY_PCT: Tag = Tag {
    key: "efficiency_pct",
    metric: "thermal_bench_efficiency_percent",
};

pub const I2R_LOSS_KW: Tag = Tag {
    key: "i2r_loss_kw",
    metric: "thermal_bench_i2r_loss_kilowatts",
};

pub const MOTOR_SPEED_RPM: Tag = Tag {
    key: "motor_speed_rpm",
    metric: "thermal_bench_motor_speed_rpm",
};

pub const TICK_GAP_S: Tag = Tag {
    key: "tick_gap_s",
    metric: "thermal_bench_tick_gap_seconds",
};
