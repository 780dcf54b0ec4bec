use clap::Parser;
use comicforge::{convert_batch, ConvertConfig, FileOutcome, PageSource, Result};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;
use walkdir::WalkDir;

/// 📚 comicforge - 漫画EPUB转CBZ工具
#[derive(Parser)]
#[command(name = "comicforge")]
#[command(about = "将EPUB格式的漫画转换为带ComicInfo元数据的CBZ")]
#[command(version)]
struct Args {
    /// 输入文件或目录（目录中的.epub文件会被全部转换）
    #[arg(required_unless_present = "init_config", help = "要转换的EPUB文件或目录")]
    inputs: Vec<PathBuf>,

    /// 输出目录
    #[arg(short, long, help = "CBZ输出目录，默认与输入文件相同")]
    output_dir: Option<PathBuf>,

    /// 配置文件
    #[arg(short, long, help = "YAML配置文件路径")]
    config: Option<PathBuf>,

    /// 生成默认配置文件
    #[arg(long, value_name = "PATH", help = "把默认配置写入指定路径后退出")]
    init_config: Option<PathBuf>,

    /// 并行处理的文件数
    #[arg(short, long, help = "并行转换的文件数，覆盖配置文件中的jobs")]
    jobs: Option<usize>,

    /// 详细输出模式
    #[arg(short, long, help = "输出调试日志")]
    verbose: bool,
}

fn main() {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    println!("📚 comicforge - 漫画EPUB转CBZ工具");

    if let Some(path) = &args.init_config {
        match ConvertConfig::generate_default_config(path) {
            Ok(()) => println!("✅ 默认配置已写入: {}", path.display()),
            Err(e) => eprintln!("❌ 错误: {}", e),
        }
        return;
    }

    let config = match load_config(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ 错误: {}", e);
            return;
        }
    };

    let inputs = collect_inputs(&args.inputs);
    if inputs.is_empty() {
        println!("⚠️ 没有找到任何EPUB文件");
        return;
    }

    println!("🔍 共 {} 个文件，并行数 {}", inputs.len(), config.jobs);
    let outcomes = convert_batch(&inputs, args.output_dir.as_deref(), &config);
    print_summary(&outcomes);
}

fn load_config(args: &Args) -> Result<ConvertConfig> {
    let mut config = match &args.config {
        Some(path) => ConvertConfig::from_file(path)?,
        None => ConvertConfig::default(),
    };
    if let Some(jobs) = args.jobs {
        config.jobs = jobs.max(1);
    }
    Ok(config)
}

/// 展开输入：文件原样保留，目录取其中的.epub文件（按文件名排序）
fn collect_inputs(inputs: &[PathBuf]) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for input in inputs {
        if input.is_dir() {
            files.extend(
                WalkDir::new(input)
                    .max_depth(1)
                    .sort_by_file_name()
                    .into_iter()
                    .filter_map(|entry| entry.ok())
                    .filter(|entry| entry.file_type().is_file() && is_epub(entry.path()))
                    .map(|entry| entry.into_path()),
            );
        } else {
            files.push(input.clone());
        }
    }
    files
}

fn is_epub(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("epub"))
}

fn print_summary(outcomes: &[FileOutcome]) {
    println!("\n📊 转换结果:");
    let mut failed = 0;

    for outcome in outcomes {
        match &outcome.result {
            Ok(report) => {
                let source = match report.source {
                    PageSource::Spine => "脊柱",
                    PageSource::Fallback => "兜底扫描",
                };
                let cover = if report.has_cover { "，含封面" } else { "" };
                println!(
                    "  ✅ {} → {} ({} 页{}，来源: {})",
                    outcome.input.display(),
                    report.output.display(),
                    report.pages,
                    cover,
                    source
                );
            }
            Err(e) => {
                failed += 1;
                println!("  ❌ {}: {}", outcome.input.display(), e);
            }
        }
    }

    if failed == 0 {
        println!("🎉 全部 {} 个文件转换完成！", outcomes.len());
    } else {
        println!("⚠️ {} 个成功，{} 个失败", outcomes.len() - failed, failed);
    }
}
