fn describe(sides: u8) -> &'static str {
    match sides {
        0 => "round",
        n if n > 4 => "many",
        _ => "few",
    }
}

fn main() {
    let counts = [0u8, 3, 6];
    for sides in counts {
        println!("{}", describe(sides));
    }
}
