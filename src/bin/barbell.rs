// The barbell binary: see `barbell::cli` for the argument surface.

fn main() {
    barbell::cli::run();
}
