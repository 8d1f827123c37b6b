use common::GenOptions;
use common::DEFAULT_RUNTIME_HEADER;
use common::DEFAULT_UMBRELLA_NAME;
use std::path::PathBuf;
use structopt::*;

#[derive(StructOpt, Debug)]
pub struct Args {
    /// JSON binding descriptor files, generated in the order given
    #[structopt(name = "FILE", parse(from_os_str), required = true)]
    pub files: Vec<PathBuf>,

    /// directory the generated C units are written to
    #[structopt(name = "OUTPUT", short = "o", long = "out-dir", default_value = ".", parse(from_os_str))]
    pub out_dir: PathBuf,

    /// base name of the umbrella register/unregister pair and its files
    #[structopt(long = "umbrella", short = "u", default_value = DEFAULT_UMBRELLA_NAME)]
    pub umbrella: String,

    /// header the generated units include for the luajni runtime
    #[structopt(long = "runtime-header", default_value = DEFAULT_RUNTIME_HEADER)]
    pub runtime_header: String,

    /// also emit JNI_OnLoad/JNI_OnUnload driving the umbrella pair
    #[structopt(long = "load-hook")]
    pub load_hook: bool,

    /// comment generated functions with the member they bind
    #[structopt(long = "annotate", short = "a")]
    pub annotate: bool,

    /// validate the descriptors without writing anything
    #[structopt(long = "check")]
    pub check: bool,

    /// print backtrace on internal failure
    #[structopt(long = "backtrace", short = "bt")]
    pub backtrace: bool,

    #[structopt(long = "verbose", short = "v")]
    pub verbose: bool,
}

impl Args {
    pub fn gen_options(&self) -> GenOptions {
        GenOptions {
            umbrella_name: self.umbrella.clone(),
            runtime_header: self.runtime_header.clone(),
            load_hook: self.load_hook,
            annotate: self.annotate,
        }
    }
}
