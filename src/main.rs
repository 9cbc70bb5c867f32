fn main() {
    rill::cli::run();
}
