//! Check command implementation.
//!
//! Validates system requirements and configuration.

use anyhow::Result;
use herakles_proc_sampler::{KernelSource, MemoryStats, ProcfsSource};

use crate::config::{validate_effective_config, Config};

/// Validates system requirements and configuration.
pub fn command_check(proc: bool, cpu: bool, memory: bool, all: bool, config: &Config) -> Result<()> {
    println!("🔍 Herakles Process Sampler - System Check");
    println!("==========================================");

    let mut all_ok = true;
    let proc_root = config.proc_root();

    println!("\n📁 Opening {}...", proc_root.display());
    let mut source = match ProcfsSource::new(&proc_root) {
        Ok(source) => {
            let params = source.params();
            println!(
                "   ✅ procfs accessible ({} cores, page size {} KB)",
                params.cpu_count, params.page_size_kb
            );
            Some(source)
        }
        Err(e) => {
            println!("   ❌ {}", e);
            all_ok = false;
            None
        }
    };

    if let Some(source) = source.as_mut() {
        // Check process table
        if proc || all {
            println!("\n📋 Checking process table...");
            let records = source.fetch_process_snapshot();
            if records.is_empty() {
                println!("   ❌ Cannot read any process entries");
                all_ok = false;
            } else {
                println!("   ✅ Can read {} process entries", records.len());
                let max_bytes = config.sampler_settings().max_argv_bytes;
                let with_argv = records
                    .iter()
                    .filter(|r| source.fetch_argv(r, max_bytes).is_some())
                    .count();
                println!("   ✅ {} processes expose an argument vector", with_argv);
            }
        }

        // Check per-core counters
        if cpu || all {
            println!("\n🧮 Checking per-core CPU counters...");
            let cores = source.params().cpu_count;
            let failed: Vec<String> = (0..cores)
                .filter_map(|core| source.fetch_per_core_counters(core).err())
                .map(|e| e.to_string())
                .collect();
            if failed.is_empty() {
                println!("   ✅ Counters readable for all {} cores", cores);
            } else {
                for e in &failed {
                    println!("   ❌ {}", e);
                }
                all_ok = false;
            }
        }

        // Check memory counters
        if memory || all {
            println!("\n💾 Checking memory counters...");
            match source.fetch_memory_counters() {
                Ok(counters) => {
                    let stats = MemoryStats::from_counters(&counters, source.params().page_size_kb);
                    println!(
                        "   ✅ Memory counters readable: total={}MB used={}MB swap={}MB",
                        stats.total_kb / 1024,
                        stats.used_kb / 1024,
                        stats.total_swap_kb / 1024
                    );
                }
                Err(e) => {
                    println!("   ❌ {}", e);
                    all_ok = false;
                }
            }
        }
    }

    // Check configuration
    println!("\n⚙️  Checking configuration...");
    match validate_effective_config(config) {
        Ok(_) => {
            println!("   ✅ Configuration is valid");
        }
        Err(e) => {
            println!("   ❌ Configuration invalid: {}", e);
            all_ok = false;
        }
    }

    println!("\n📋 Summary:");
    if all_ok {
        println!("   ✅ All checks passed - system is ready");
        Ok(())
    } else {
        println!("   ❌ Some checks failed - please review warnings");
        std::process::exit(1);
    }
}
