fn main() -> anyhow::Result<()> {
    members::main_entry()
}
