use std::{
    io::{self, Write},
    time::UNIX_EPOCH,
};

use crate::point::{FieldValue, Point};

pub const VALUE_FIELD: &str = "value";

/// Appends `point` to `wtr` as one line of InfluxDB line protocol.
pub fn encode_point(wtr: &mut impl Write, point: &Point) -> io::Result<()> {
    write_escaped(wtr, &point.measurement, &[',', ' '])?;
    let (key, value) = &point.tag;
    if !key.is_empty() && !value.is_empty() {
        wtr.write_all(b",")?;
        write_escaped(wtr, key, &[',', '=', ' '])?;
        wtr.write_all(b"=")?;
        write_escaped(wtr, value, &[',', '=', ' '])?;
    }
    wtr.write_all(b" ")?;
    wtr.write_all(VALUE_FIELD.as_bytes())?;
    wtr.write_all(b"=")?;
    encode_field(wtr, point.value)?;
    wtr.write_all(b" ")?;
    write!(wtr, "{}", encode_timestamp(point))?;
    wtr.write_all(b"\n")
}

/// NaN and infinities have no line-protocol form and fail with `InvalidInput`.
fn encode_field(wtr: &mut impl Write, value: FieldValue) -> io::Result<()> {
    match value {
        FieldValue::Int(v) => write!(wtr, "{v}i"),
        FieldValue::Float(v) if v.is_finite() => write!(wtr, "{v:?}"),
        FieldValue::Float(v) => Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("non-finite field value {v}"),
        )),
    }
}

/// Nanoseconds since the Unix epoch; times before the epoch clamp to zero.
pub fn encode_timestamp(point: &Point) -> u128 {
    point
        .time
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0)
}

fn write_escaped(wtr: &mut impl Write, s: &str, special: &[char]) -> io::Result<()> {
    let mut buf = [0; 4];
    for c in s.chars() {
        let control: &[u8] = match c {
            '\n' => b"\\n",
            '\r' => b"\\r",
            '\t' => b"\\t",
            '\x0c' => b"\\f",
            _ => b"",
        };
        if !control.is_empty() {
            wtr.write_all(control)?;
            continue;
        }
        if special.contains(&c) {
            wtr.write_all(b"\\")?;
        }
        wtr.write_all(c.encode_utf8(&mut buf).as_bytes())?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn line(point: &Point) -> String {
        let mut buf = vec![];
        encode_point(&mut buf, point).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn test_int_field() {
        let p = Point::new("svc1", "svc1", "requests", 8).at(UNIX_EPOCH + Duration::from_secs(1));
        assert_eq!(line(&p), "svc1,svc1=requests value=8i 1000000000\n");
    }

    #[test]
    fn test_float_field() {
        let p = Point::new("svc1", "stat", "latency_ms", 6.5).at(UNIX_EPOCH);
        assert_eq!(line(&p), "svc1,stat=latency_ms value=6.5 0\n");
        let p = Point::new("svc1", "stat", "x", 2.0).at(UNIX_EPOCH);
        assert_eq!(line(&p), "svc1,stat=x value=2.0 0\n");
    }

    #[test]
    fn test_escaping() {
        let p = Point::new("my db,x", "a=b", "c d,e", 1).at(UNIX_EPOCH);
        assert_eq!(line(&p), "my\\ db\\,x,a\\=b=c\\ d\\,e value=1i 0\n");
    }

    #[test]
    fn test_control_characters_stay_on_one_line() {
        let p = Point::new("svc1", "svc1", "evil\nother value=9i", 1).at(UNIX_EPOCH);
        let s = line(&p);
        assert_eq!(s.lines().count(), 1);
        assert_eq!(s, "svc1,svc1=evil\\nother\\ value\\=9i value=1i 0\n");

        let p = Point::new("a\tb", "k\rk", "v\x0cv", 1).at(UNIX_EPOCH);
        assert_eq!(line(&p), "a\\tb,k\\rk=v\\fv value=1i 0\n");
    }

    #[test]
    fn test_non_finite_float_is_rejected() {
        for v in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            let mut buf = vec![];
            let err = encode_point(&mut buf, &Point::new("svc1", "svc1", "x", v)).unwrap_err();
            assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
        }
    }

    #[test]
    fn test_empty_tag_is_omitted() {
        let p = Point::new("m", "k", "", 1).at(UNIX_EPOCH);
        assert_eq!(line(&p), "m value=1i 0\n");
    }
}
