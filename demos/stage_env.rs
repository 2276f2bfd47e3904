use stage_env_tools::config::ExtractConfig;
use stage_env_tools::source::{IsoRom, RomDir, RomSource};
use stage_env_tools::{load_stage_env, StageEnvSet};

// stage_env <disc.iso | extracted dir> [symbols.lst] [stage ids...]
fn main() {
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let rom_path = args.next().expect("usage: stage_env <disc.iso | dir> [symbols.lst] [stage ids...]");

    let mut lst = None;
    let mut requested = Vec::new();
    for arg in args {
        match arg.parse::<u32>() {
            Ok(id) => requested.push(id),
            Err(_) => lst = Some(std::fs::read_to_string(&arg).unwrap()),
        }
    }

    let config = ExtractConfig::from_lst(lst.as_deref());
    let requested = (!requested.is_empty()).then_some(requested.as_slice());

    let set = if rom_path.ends_with(".iso") {
        run(&mut IsoRom::open(&rom_path).unwrap(), &config, requested)
    } else {
        run(&mut RomDir::new(&rom_path), &config, requested)
    };

    for (id, env) in set.stages.iter() {
        let name = set.stage_names.get(id).map(|n| &**n).unwrap_or("-");
        let bg = env.bg.as_ref().map(|b| &*b.file_name).unwrap_or("-");
        println!("{:03} {:<24} {:<12} fog: {:?}", id, name, bg, env.fog.as_ref().map(|f| (f.kind, f.start, f.end)));
    }

    println!("backgrounds: {}", set.referenced_bgs().join(" "));
}

fn run(source: &mut impl RomSource, config: &ExtractConfig, requested: Option<&[u32]>) -> StageEnvSet {
    load_stage_env(source, config, requested).unwrap()
}
