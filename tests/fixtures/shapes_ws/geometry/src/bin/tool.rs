fn main() {
    let unit = geometry::scale(1.0_f64);
    println!("{}", unit);
}
