fn main() {
    macropp::cli::run();
}
