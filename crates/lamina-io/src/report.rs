//! Assembly reports: bill of materials and pick-and-place centroids.

use std::collections::BTreeMap;

use lamina_core::{Board, Side};

use crate::ExportError;

/// BOM line ordering by reference designator family: ICs first, then
/// connectors, crystals, and passives. Unknown families sort last.
const FAMILY_RANK: &str = "UJKTRCMY";

fn family_rank(family: char) -> usize {
    FAMILY_RANK.find(family).unwrap_or(FAMILY_RANK.len())
}

/// Collapse runs of three or more consecutive designators: `R1 R2 R3 R5`
/// becomes `R1-3 R5`. All ids share one family letter.
pub fn pretty_parts(ids: &[String]) -> String {
    let family = match ids.first().and_then(|id| id.chars().next()) {
        Some(f) => f,
        None => return String::new(),
    };
    let nums: Vec<i64> = ids.iter().filter_map(|id| id[1..].parse().ok()).collect();
    let mut out: Vec<String> = Vec::new();
    let mut i = 0;
    while i < nums.len() {
        let mut j = i;
        while j + 1 < nums.len() && nums[j + 1] == nums[j] + 1 {
            j += 1;
        }
        if j - i >= 2 {
            out.push(format!("{}{}-{}", family, nums[i], nums[j]));
            i = j + 1;
        } else {
            out.push(format!("{}{}", family, nums[i]));
            i += 1;
        }
    }
    out.join(" ")
}

fn finish(buf: Vec<u8>) -> Result<String, ExportError> {
    Ok(String::from_utf8(buf)?)
}

/// The bill of materials as CSV: identical parts grouped into one line,
/// lines ordered by family rank then device.
pub fn bom_csv(board: &Board) -> Result<String, ExportError> {
    type Key = (usize, String, String, String, String);
    let mut groups: BTreeMap<Key, Vec<String>> = BTreeMap::new();
    for part in board.parts() {
        if !part.in_bom {
            continue;
        }
        let key = (
            family_rank(part.family),
            format!("{}{}", part.mfr, part.val),
            part.footprint.clone(),
            part.vendor.clone(),
            part.vendor_code.clone(),
        );
        groups.entry(key).or_default().push(part.id.clone());
    }

    let mut buf = Vec::new();
    {
        let mut wtr = csv::Writer::from_writer(&mut buf);
        wtr.write_record(["parts", "qty", "device", "package", "vendor", "code"])?;
        for ((_, device, footprint, vendor, code), ids) in &groups {
            wtr.write_record([
                pretty_parts(ids).as_str(),
                &ids.len().to_string(),
                device,
                footprint,
                vendor,
                code,
            ])?;
        }
        wtr.flush()?;
    }
    finish(buf)
}

/// Pick-and-place centroids as CSV, one row per BOM part.
pub fn centroids_csv(board: &Board) -> Result<String, ExportError> {
    let mut buf = Vec::new();
    {
        let mut wtr = csv::Writer::from_writer(&mut buf);
        wtr.write_record([
            "Designator",
            "Center(X)",
            "Center(Y)",
            "Rotation",
            "Layer",
            "Note",
        ])?;
        for part in board.parts() {
            if !part.in_bom {
                continue;
            }
            let mut note = part.footprint.clone();
            if !part.mfr.is_empty() {
                note = format!("{}-{}", note, part.mfr);
            }
            if !part.val.is_empty() {
                note = format!("{}-{}", note, part.val);
            }
            let side = match part.side {
                Side::Top => "top",
                Side::Bottom => "bottom",
            };
            wtr.write_record([
                part.id.as_str(),
                &format!("{:.3}", part.center.x),
                &format!("{:.3}", part.center.y),
                &format!("{}", part.rotation.round() as i64),
                side,
                &note,
            ])?;
        }
        wtr.flush()?;
    }
    finish(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lamina_core::{ChipDiscrete, ChipSize, PinHeader};

    fn ids(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_pretty_parts_collapses_runs() {
        assert_eq!(
            pretty_parts(&ids(&["R1", "R2", "R3", "R5"])),
            "R1-3 R5"
        );
        assert_eq!(pretty_parts(&ids(&["C1", "C2"])), "C1 C2");
        assert_eq!(pretty_parts(&ids(&["U1"])), "U1");
        assert_eq!(pretty_parts(&[]), "");
    }

    #[test]
    fn test_bom_groups_identical_parts() {
        let mut board = Board::new(60.0, 40.0);
        let r = ChipDiscrete::resistor(ChipSize::I0603, "10k");
        for i in 0..3 {
            board.add_part((10.0 + 5.0 * i as f64, 10.0), &r, Side::Top);
        }
        let c = ChipDiscrete::capacitor(ChipSize::I0402, "100n");
        board.add_part((10.0, 20.0), &c, Side::Top);
        let bom = bom_csv(&board).unwrap();
        let lines: Vec<&str> = bom.lines().collect();
        assert_eq!(lines[0], "parts,qty,device,package,vendor,code");
        // header + two groups
        assert_eq!(lines.len(), 3);
        assert!(bom.contains("R1-3,3,10k,0603"));
        assert!(bom.contains("C1,1,100n,0402"));
    }

    #[test]
    fn test_bom_rank_orders_connectors_before_passives() {
        let mut board = Board::new(60.0, 40.0);
        let r = ChipDiscrete::resistor(ChipSize::I0603, "10k");
        board.add_part((10.0, 10.0), &r, Side::Top);
        let j = PinHeader::sil(2);
        board.add_part((30.0, 10.0), &j, Side::Top);
        let bom = bom_csv(&board).unwrap();
        let j_pos = bom.find("J1").unwrap();
        let r_pos = bom.find("R1").unwrap();
        assert!(j_pos < r_pos);
    }

    #[test]
    fn test_centroids_rows() {
        let mut board = Board::new(60.0, 40.0);
        let r = ChipDiscrete::resistor(ChipSize::I0805, "1k");
        board.add_part((12.5, 20.0), &r, Side::Bottom);
        let csv = centroids_csv(&board).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(
            lines[0],
            "Designator,Center(X),Center(Y),Rotation,Layer,Note"
        );
        assert_eq!(lines[1], "R1,12.500,20.000,0,bottom,0805-1k");
    }
}
