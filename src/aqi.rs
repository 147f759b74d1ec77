//! PM2.5 ↔ standardized index conversion
//!
//! Piecewise-linear interpolation over the fixed EPA breakpoint table for
//! 24-hour PM2.5. The forward direction is exact and deterministic; the
//! inverse is an estimate used only for sources that report the index
//! without a raw concentration.

/// One regulatory breakpoint band.
struct Breakpoint {
    conc_low: f64,
    conc_high: f64,
    aqi_low: u16,
    aqi_high: u16,
}

/// EPA standard breakpoints for PM2.5 (24-hour average), µg/m³.
const PM25_BREAKPOINTS: [Breakpoint; 6] = [
    Breakpoint {
        conc_low: 0.0,
        conc_high: 12.0,
        aqi_low: 0,
        aqi_high: 50,
    },
    Breakpoint {
        conc_low: 12.1,
        conc_high: 35.4,
        aqi_low: 51,
        aqi_high: 100,
    },
    Breakpoint {
        conc_low: 35.5,
        conc_high: 55.4,
        aqi_low: 101,
        aqi_high: 150,
    },
    Breakpoint {
        conc_low: 55.5,
        conc_high: 150.4,
        aqi_low: 151,
        aqi_high: 200,
    },
    Breakpoint {
        conc_low: 150.5,
        conc_high: 250.4,
        aqi_low: 201,
        aqi_high: 300,
    },
    Breakpoint {
        conc_low: 250.5,
        conc_high: 500.4,
        aqi_low: 301,
        aqi_high: 500,
    },
];

/// Convert a PM2.5 concentration (µg/m³) to the standardized index.
///
/// Negative input is treated as 0; concentrations above the last band
/// saturate at 500.
#[must_use]
pub fn aqi_from_pm25(pm25: f64) -> u16 {
    if pm25 <= 0.0 {
        return 0;
    }

    // The regulatory tables band concentrations truncated to one decimal.
    let conc = (pm25 * 10.0).floor() / 10.0;

    for bp in &PM25_BREAKPOINTS {
        if conc <= bp.conc_high {
            let index_span = f64::from(bp.aqi_high - bp.aqi_low);
            let conc_span = bp.conc_high - bp.conc_low;
            let aqi = index_span / conc_span * (conc - bp.conc_low) + f64::from(bp.aqi_low);
            return aqi.round().clamp(0.0, 500.0) as u16;
        }
    }

    500
}

/// Approximate inverse: estimate the PM2.5 concentration (µg/m³) behind an
/// index value, via the same band's interpolation run in reverse.
#[must_use]
pub fn pm25_from_aqi(aqi: u16) -> f64 {
    let aqi = aqi.min(500);

    for bp in &PM25_BREAKPOINTS {
        if aqi <= bp.aqi_high {
            let index_span = f64::from(bp.aqi_high - bp.aqi_low);
            let conc_span = bp.conc_high - bp.conc_low;
            return f64::from(aqi - bp.aqi_low) / index_span * conc_span + bp.conc_low;
        }
    }

    // Unreachable after the min(500) clamp; the last band ends at 500.
    500.4
}
