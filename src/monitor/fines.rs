//! Tabla de multas por exceso de velocidad

/// Límite legal usado por la tabla (km/h)
pub const LEGAL_LIMIT: u32 = 80;

/// Importe del challan para una velocidad; `None` si no hay exceso
pub fn fine_for_speed(speed: u32) -> Option<u32> {
    fine_for_overspeed(speed.checked_sub(LEGAL_LIMIT)?)
}

/// Importe según los km/h por encima del límite
pub fn fine_for_overspeed(overspeed: u32) -> Option<u32> {
    match overspeed {
        0 => None,
        1..=10 => Some(500),
        11..=20 => Some(1000),
        21..=30 => Some(2000),
        _ => Some(3000),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fine_schedule() {
        assert_eq!(fine_for_speed(85), Some(500));
        assert_eq!(fine_for_speed(95), Some(1000));
        assert_eq!(fine_for_speed(105), Some(2000));
        assert_eq!(fine_for_speed(115), Some(3000));
    }

    #[test]
    fn test_fine_schedule_boundaries() {
        assert_eq!(fine_for_speed(0), None);
        assert_eq!(fine_for_speed(80), None);
        assert_eq!(fine_for_speed(81), Some(500));
        assert_eq!(fine_for_speed(90), Some(500));
        assert_eq!(fine_for_speed(91), Some(1000));
        assert_eq!(fine_for_speed(100), Some(1000));
        assert_eq!(fine_for_speed(110), Some(2000));
        assert_eq!(fine_for_speed(111), Some(3000));
        assert_eq!(fine_for_speed(120), Some(3000));
    }
}
