fn main() -> anyhow::Result<()> {
    synapseview::run()
}
