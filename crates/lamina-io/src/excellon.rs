//! Excellon drill file writer.
//!
//! One file per plating class: tools are numbered from T2 upward in
//! ascending diameter order, coordinates are metric with trailing zeros
//! kept, in thousandths of a millimeter.

use lamina_core::DrillHit;

fn number(n: f64) -> String {
    format!("{:03}", (n * 1000.0).round() as i64)
}

/// Render drill hits as an Excellon program.
///
/// Hits are grouped into tools by exact diameter; the caller filters for
/// plated or non-plated beforehand.
pub fn excellon<'a, I>(hits: I) -> String
where
    I: IntoIterator<Item = &'a DrillHit>,
{
    // Group by diameter, tools sorted ascending.
    let mut tools: Vec<(f64, Vec<(f64, f64)>)> = Vec::new();
    for hit in hits {
        match tools
            .iter_mut()
            .find(|(d, _)| (*d - hit.diameter).abs() < 1e-9)
        {
            Some((_, xys)) => xys.push((hit.x, hit.y)),
            None => tools.push((hit.diameter, vec![(hit.x, hit.y)])),
        }
    }
    tools.sort_by(|a, b| a.0.partial_cmp(&b.0).expect("drill diameter is NaN"));

    let mut header = String::new();
    let mut body = String::new();
    for (i, (d, xys)) in tools.iter().enumerate() {
        header.push_str(&format!("T{}C{:.3}\n", i + 2, d));
        body.push_str(&format!("T{}\n", i + 2));
        for (x, y) in xys {
            body.push_str(&format!("X{}Y{}\n", number(*x), number(*y)));
        }
    }

    format!(
        "M48\nFMAT,2\nICI,OFF\nMETRIC,TZ,000.000\n{}%\nG90\nM71\n{}M30\n",
        header, body
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hit(x: f64, y: f64, d: f64) -> DrillHit {
        DrillHit {
            x,
            y,
            diameter: d,
            plated: true,
        }
    }

    #[test]
    fn test_empty_program_still_valid() {
        let out = excellon([].iter());
        assert!(out.starts_with("M48\nFMAT,2\nICI,OFF\nMETRIC,TZ,000.000\n%\n"));
        assert!(out.ends_with("M30\n"));
    }

    #[test]
    fn test_tools_sorted_and_numbered_from_t2() {
        let hits = vec![hit(1.0, 2.0, 0.8), hit(3.0, 4.0, 0.5), hit(5.0, 6.0, 0.8)];
        let out = excellon(hits.iter());
        // smaller drill gets the lower tool number
        assert!(out.contains("T2C0.500\n"));
        assert!(out.contains("T3C0.800\n"));
        let t2 = out.find("T2\n").unwrap();
        let t3 = out.find("T3\n").unwrap();
        assert!(t2 < t3);
    }

    #[test]
    fn test_coordinates_in_micro_units() {
        let out = excellon([hit(10.0, 2.5, 0.5)].iter());
        assert!(out.contains("X10000Y2500\n"));
        // sub-millimeter coordinates keep three digits
        let out = excellon([hit(0.05, 0.001, 0.5)].iter());
        assert!(out.contains("X050Y001\n"));
    }
}
