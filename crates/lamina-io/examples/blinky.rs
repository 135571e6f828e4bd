//! End-to-end board script: a small LED blinker carrier with a pin
//! header, a resistor, a capacitor, mounting holes, a ground pour, and
//! the full fab package written to `blinky_out/`.

use std::path::Path;

use lamina_core::{Board, ChipDiscrete, ChipSize, LayerCode, PinHeader, Side};
use lamina_io::save_board;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let mut board = Board::new(40.0, 30.0);
    board.add_outline();
    for xy in [(3.0, 3.0), (37.0, 3.0), (3.0, 27.0), (37.0, 27.0)] {
        board.add_hole(xy, 2.5);
    }

    let j1 = board.add_part((8.0, 15.0), &PinHeader::sil(4), Side::Top);
    let r1 = board.add_part(
        (20.0, 18.0),
        &ChipDiscrete::resistor(ChipSize::I0603, "330R"),
        Side::Top,
    );
    board.add_part(
        (20.0, 12.0),
        &ChipDiscrete::capacitor(ChipSize::I0603, "100n"),
        Side::Top,
    );

    // Signal from header pin 1 to the resistor.
    let mut sig = board.find_part(&j1).unwrap().pad("1").unwrap().clone();
    sig.set_name("LED");
    sig.turtle(&mut board, &format!("> {}-1", r1))?;

    // Resistor output escapes outward, drops through, and joins the pour.
    let mut out = board.find_part(&r1).unwrap().pad("2").unwrap().clone();
    out.set_name("GND");
    out.outside(&board);
    out.forward(1.5);
    out.wire(&mut board);
    out.through(&mut board);

    board.fill_layer(LayerCode::BottomCopper, "GND");

    let violations = lamina_drc::perform_drc(&mut board);
    for v in &violations {
        eprintln!("DRC: {}", v.message);
    }

    save_board(&mut board, Path::new("blinky_out"), "blinky")?;
    println!(
        "blinky: {} parts, {} drills, {} DRC violation(s)",
        board.parts().count(),
        board.drills().len(),
        violations.len()
    );
    Ok(())
}
