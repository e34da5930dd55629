//! The 12-byte timezone and date block carried in discovery frames.

use chrono::{DateTime, Datelike, Local, Offset, TimeZone, Timelike};

/// Local time broken down the way discovery frames encode it.
///
/// The block is a pure function of a wall-clock time and its UTC offset, so
/// it can be produced for `now` or for a pinned instant in tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimestampBlock {
    /// Whole hours east of UTC (negative west).
    pub utc_offset_hours: i32,
    pub year: u16,
    /// 1-12.
    pub month: u8,
    pub day: u8,
    /// Day of week, Sunday = 0.
    pub weekday: u8,
    pub hour: u8,
    pub minute: u8,
}

impl TimestampBlock {
    /// Capture the current local time.
    pub fn now() -> Self {
        Self::from_datetime(&Local::now())
    }

    /// Break down an arbitrary datetime in its own timezone.
    pub fn from_datetime<Tz: TimeZone>(t: &DateTime<Tz>) -> Self {
        let offset_seconds = t.offset().fix().local_minus_utc();
        Self {
            utc_offset_hours: offset_seconds / 3600,
            year: t.year() as u16,
            month: t.month() as u8,
            day: t.day() as u8,
            weekday: t.weekday().num_days_from_sunday() as u8,
            hour: t.hour() as u8,
            minute: t.minute() as u8,
        }
    }

    /// Encode into the 12-byte wire layout.
    ///
    /// Byte 0 carries the UTC offset; negative offsets sign-extend into the
    /// three `0xff` fill bytes that follow. Year is little-endian at 4..6,
    /// then minute, hour, two-digit year, weekday, day and month.
    pub fn encode(&self) -> [u8; 12] {
        let mut b = [0u8; 12];
        if self.utc_offset_hours < 0 {
            b[0] = (0xff + self.utc_offset_hours - 1) as u8;
            b[1] = 0xff;
            b[2] = 0xff;
            b[3] = 0xff;
        } else {
            b[0] = self.utc_offset_hours as u8;
        }
        b[4] = (self.year & 0xff) as u8;
        b[5] = (self.year >> 8) as u8;
        b[6] = self.minute;
        b[7] = self.hour;
        b[8] = (self.year % 100) as u8;
        b[9] = self.weekday;
        b[10] = self.day;
        b[11] = self.month;
        b
    }

    /// Decode a wire block back into its fields.
    pub fn decode(raw: &[u8; 12]) -> Self {
        let utc_offset_hours = if raw[1] == 0xff {
            raw[0] as i32 - 0xff + 1
        } else {
            raw[0] as i32
        };
        Self {
            utc_offset_hours,
            year: u16::from_le_bytes([raw[4], raw[5]]),
            month: raw[11],
            day: raw[10],
            weekday: raw[9],
            hour: raw[7],
            minute: raw[6],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::FixedOffset;

    fn sample(offset_hours: i32) -> TimestampBlock {
        let tz = FixedOffset::east_opt(offset_hours * 3600).unwrap();
        let t = tz.with_ymd_and_hms(2023, 6, 15, 10, 30, 0).unwrap();
        TimestampBlock::from_datetime(&t)
    }

    #[test]
    fn test_breakdown_fields() {
        let ts = sample(8);
        assert_eq!(ts.utc_offset_hours, 8);
        assert_eq!(ts.year, 2023);
        assert_eq!(ts.month, 6);
        assert_eq!(ts.day, 15);
        // 2023-06-15 was a Thursday
        assert_eq!(ts.weekday, 4);
        assert_eq!(ts.hour, 10);
        assert_eq!(ts.minute, 30);
    }

    #[test]
    fn test_encode_positive_offset() {
        let encoded = sample(8).encode();
        assert_eq!(
            encoded,
            [0x08, 0x00, 0x00, 0x00, 0xe7, 0x07, 0x1e, 0x0a, 0x17, 0x04, 0x0f, 0x06]
        );
    }

    #[test]
    fn test_encode_negative_offset() {
        let encoded = sample(-5).encode();
        assert_eq!(encoded[0], 0xf9);
        assert_eq!(&encoded[1..4], &[0xff, 0xff, 0xff]);
    }

    #[test]
    fn test_encode_decode_round_trip() {
        for offset in [-11, -5, 0, 8, 13] {
            let ts = sample(offset);
            let decoded = TimestampBlock::decode(&ts.encode());
            assert_eq!(decoded, ts);
            // re-emitting must be byte-identical
            assert_eq!(decoded.encode(), ts.encode());
        }
    }
}
