//! Measures two rectangular objects and prints the result table.

use labelmetry::{measure, MeasureConfig, NdImage, PhysicalQuantity};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let (width, height) = (24, 16);
    let mut labels = vec![0u32; width * height];
    let mut grey = vec![0.0f64; width * height];
    for y in 0..height {
        for x in 0..width {
            let i = x + width * y;
            if (2..8).contains(&x) && (3..9).contains(&y) {
                labels[i] = 1;
            } else if (12..22).contains(&x) && (6..10).contains(&y) {
                labels[i] = 2;
            }
            grey[i] = (x + y) as f64;
        }
    }

    let labels = NdImage::from_vec(vec![width, height], labels)?.with_pixel_size(vec![
        Some(PhysicalQuantity::micrometers(0.5)),
        Some(PhysicalQuantity::micrometers(0.5)),
    ])?;
    let grey = NdImage::from_vec(vec![width, height], grey)?;

    let config = MeasureConfig::new([
        "Size",
        "InertiaTensor",
        "GreyStatistics",
        "GreyExtrema",
        "PrincipalMoments",
        "PrincipalAxes",
    ]);
    let result = measure(&labels, Some(&grey), &config)?;

    for (r, &id) in result.objects().iter().enumerate() {
        println!("object {id}:");
        for col in result.columns() {
            let row = result.row(r);
            print!("  {}:", col.feature);
            for (v, info) in row[col.offset..col.offset + col.len()]
                .iter()
                .zip(&col.values)
            {
                print!(" {}={:.4} [{}]", info.name, v, info.units);
            }
            println!();
        }
    }
    Ok(())
}
