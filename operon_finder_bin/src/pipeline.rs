use std::fs::File;

use log::info;

use crate::analysis::classifier::read_classifier_file;
use crate::analysis::hmm::show_config;
use crate::analysis::segment::SegmentationSummary;
use crate::analysis::OperonAnalyzer;
use crate::cli::Args;
use crate::evidence::alignment::read_alignment_hits_file;
use crate::evidence::emission::read_emission_matrix;
use crate::evidence::kegg::{read_ko_descriptions_file, read_ko_map_file, read_kofam_assignments_file, KeggAnnotations};
use crate::evidence::links::read_protein_links_file;
use crate::genes::table::read_gene_table_file;
use crate::genes::{Error, GeneTable, Result};
use crate::gff::{merge_operons, read_gff_genes_file};
use crate::output::{operon_names, write_operon_table, StagedOutput};

fn load_genes(args: &Args) -> Result<GeneTable> {
    match (&args.gff, &args.genes) {
        (Some(gff), _) => read_gff_genes_file(gff),
        (None, Some(genes)) => read_gene_table_file(genes),
        (None, None) => Err(Error::InvalidValue("No gene source given".to_string())),
    }
}

/// Loads every input named by `args`, predicts operons and writes the outputs.
pub fn run(args: &Args) -> Result<SegmentationSummary> {
    let genes = load_genes(args)?;
    info!(
        "Loaded {} genes on {} contigs",
        genes.len(),
        genes.get_all_contigs().len()
    );

    let emission = read_emission_matrix(&args.emission_matrix)?;
    show_config();

    let mut hits = read_alignment_hits_file(&args.diamond)?;
    if let Some(taxid) = &args.taxid {
        hits.strip_target_prefix(taxid);
    }
    info!("Loaded best alignment hits for {} proteins", hits.len());

    let wanted = hits.get_targets();
    let links = read_protein_links_file(&args.protein_links, args.taxid.as_deref(), Some(&wanted))?;
    info!("Loaded {} protein links", links.len());

    let ko_map = read_ko_map_file(&args.ko_map)?;
    let kegg = KeggAnnotations::new(read_kofam_assignments_file(&args.kofam)?, &ko_map);
    info!("Loaded KEGG annotations for {} proteins, {} KOs mapped to pathways", kegg.len(), ko_map.len());

    let descriptions = match &args.ko_descriptions {
        Some(path) => Some(read_ko_descriptions_file(path)?),
        None => None,
    };

    let classifier = read_classifier_file(&args.model)?;
    info!("Classifier: {}", classifier.describe());

    let analyzer = OperonAnalyzer::new(
        &genes,
        &emission,
        &hits,
        &links,
        &kegg,
        args.scoring_scope(),
        args.reset_at_contig,
    );
    let result = analyzer.analyze(&classifier)?;

    // Nothing is moved into place until every output has been written
    let table = StagedOutput::new(&args.output)?;
    write_operon_table(
        table.writer(),
        &genes,
        result.get_assignments(),
        &kegg,
        descriptions.as_ref(),
    )?;

    let annotation = match (&args.gff, &args.output_gff) {
        (Some(gff), Some(output_gff)) => {
            let staged = StagedOutput::new(output_gff)?;
            let input = File::open(gff)
                .map_err(|e| Error::MissingArtifact(format!("GFF {}: {}", gff.display(), e)))?;
            let names = operon_names(&genes, result.get_assignments());
            let annotated = merge_operons(input, staged.writer(), &names)?;
            Some((staged, annotated))
        }
        _ => None,
    };

    table.commit()?;
    info!("Wrote operon table to {}", args.output.display());

    if let Some((staged, annotated)) = annotation {
        let path = staged.get_path().to_path_buf();
        staged.commit()?;
        info!("Wrote {} annotated CDS features to {}", annotated, path.display());
    }

    Ok(*result.get_summary())
}
