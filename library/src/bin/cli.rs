use nodescript::ScriptError;
use nodescript::run;

fn main() -> Result<(), ScriptError> {
    env_logger::init();
    run(std::env::args().collect())
}
