use clap::Parser;
use create_odc_stac::geometry::Proj4Projector;
use create_odc_stac::process::{self, BatchOptions};
use create_odc_stac::product::ProductDefinition;
use create_odc_stac::{config, output, scan};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "create-odc-stac")]
#[command(about = "Write STAC Items and ODC datasets for a directory of rasters")]
#[command(long_about = "\
Write STAC Items and ODC datasets for a directory of rasters

Every file under DIRECTORY whose name ends with --extension gets two documents
written beside it, and the batch gets one product definition:

  rasters/
  ├── odc-stac.toml                                  # Optional COG profile
  ├── demo.odc-product.yaml                          # Product (--create-product)
  ├── SENSOR_L1_X_202001010000_band.tif              # Input raster
  ├── SENSOR_L1_X_202001010000_band.json             # STAC Item
  └── SENSOR_L1_X_202001010000_band.odc-dataset.json # ODC eo3 dataset

The acquisition time comes from --default-date, or from the fourth
underscore-separated field of the file name (YYYYMMDDhhmm, taken as UTC).

With --cog-convert each raster is first re-encoded as a cloud-optimized GeoTIFF
and the documents describe the new file. Rasters that already end in .tif
cannot be converted in place.

Run 'create-odc-stac --gen-config' to print a documented odc-stac.toml.")]
#[command(version)]
struct Cli {
    /// Directory to search for rasters
    #[arg(required_unless_present = "gen_config")]
    directory: Option<PathBuf>,

    /// File name suffix that marks a raster
    #[arg(long, default_value = ".tif")]
    extension: String,

    /// Datetime used for every raster instead of inferring it from the file name
    #[arg(long)]
    default_date: Option<String>,

    /// Platform recorded in every Item; also names the product
    #[arg(long, required_unless_present = "gen_config")]
    platform: Option<String>,

    /// Name of the single band (asset and measurement key)
    #[arg(long, required_unless_present = "gen_config")]
    band_name: Option<String>,

    /// Band data type declared in the product definition
    #[arg(long, default_value = "uint8")]
    band_type: String,

    /// Band nodata value declared in the product definition
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    band_nodata: f64,

    /// Write <platform>.odc-product.yaml into DIRECTORY (default)
    #[arg(long, overrides_with = "no_create_product")]
    create_product: bool,

    /// Do not write a product definition
    #[arg(long, overrides_with = "create_product")]
    no_create_product: bool,

    /// Re-encode each raster as a cloud-optimized GeoTIFF first
    #[arg(long, overrides_with = "no_cog_convert")]
    cog_convert: bool,

    /// Describe rasters as they are (default)
    #[arg(long, overrides_with = "cog_convert")]
    no_cog_convert: bool,

    /// Print a stock odc-stac.toml with all options documented and exit
    #[arg(long)]
    gen_config: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    if cli.gen_config {
        print!("{}", config::stock_config_toml());
        return Ok(());
    }

    let (Some(directory), Some(platform), Some(band_name)) =
        (cli.directory, cli.platform, cli.band_name)
    else {
        return Err("DIRECTORY, --platform and --band-name are required".into());
    };

    let batch_config = config::load_config(&directory)?;
    let rasters = scan::scan(&directory, &cli.extension)?;

    if cli.create_product || !cli.no_create_product {
        let product = ProductDefinition {
            platform: platform.clone(),
            band_name: band_name.clone(),
            band_type: cli.band_type,
            band_nodata: cli.band_nodata,
        };
        output::print_product(&product.write(&directory)?);
    }

    let options = BatchOptions {
        platform,
        band_name,
        default_date: cli.default_date,
        cog_convert: cli.cog_convert && !cli.no_cog_convert,
        profile: batch_config.cog,
    };
    let report = process::process_rasters(
        rasters,
        &options,
        &Proj4Projector::new(),
        output::print_batch_event,
    )?;
    output::print_summary(&report);

    Ok(())
}
